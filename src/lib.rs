//! Browser wallet connection state for Leptos apps.
//!
//! - [`WalletManager`] - owns the connection lifecycle and reconciles
//!   provider account changes into state
//! - [`provider`] - the [`WalletProvider`] capability and its EIP-1193 and
//!   mock implementations
//! - [`context`] - Leptos context wiring ([`provide_wallet`], [`use_wallet`])
//! - [`format_address`] - shortened address for display

pub mod config;
pub mod context;
pub mod error;
mod manager;
pub mod models;
pub mod provider;
pub mod utils;

pub use context::{WalletContext, provide_wallet, use_wallet};
pub use error::{ProviderFault, WalletError};
pub use manager::{WalletHandle, WalletManager};
pub use models::{Account, ConnectionState, ErrorInfo, ErrorKind, WalletSnapshot};
pub use provider::{SubscriptionHandle, WalletProvider};
pub use utils::format_address;

/// Install the panic hook and console logger. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init_browser() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::default());
    });
}
