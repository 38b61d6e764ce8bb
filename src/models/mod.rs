//! Data models and types for wallet connection state.
//!
//! - [`Account`] - opaque wallet address
//! - [`ConnectionState`], [`StateEvent`] - the connection state machine
//! - [`ErrorInfo`], [`ErrorKind`] - classified connection failures
//! - [`WalletSnapshot`] - read-only view handed to consumers

mod wallet;

pub use wallet::{Account, ConnectionState, ErrorInfo, ErrorKind, StateEvent, WalletSnapshot};
