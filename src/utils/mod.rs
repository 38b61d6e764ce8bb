//! Utility modules.
//!
//! Provides:
//! - [`format_address`] - shortened wallet address for display

mod format;

pub use format::format_address;
