//! Wallet configuration.
//!
//! Centralizes the provider protocol names, user-facing messages and display
//! constants used throughout the crate.

// =============================================================================
// Provider Protocol (EIP-1193)
// =============================================================================

/// JSON-RPC method that prompts the user for account access.
pub const REQUEST_ACCOUNTS_METHOD: &str = "eth_requestAccounts";

/// Provider event emitted when the active account set changes.
pub const ACCOUNTS_CHANGED_EVENT: &str = "accountsChanged";

/// Rejection code wallets use when the user denies a request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

// =============================================================================
// Messages
// =============================================================================

/// Connection failure messages shown to the user.
pub mod messages {
    /// No injected provider was found.
    pub const PROVIDER_UNAVAILABLE: &str =
        "MetaMask not detected. Please install it to continue.";
    /// Provider resolved the request with an empty account list.
    pub const NO_ACCOUNTS_RETURNED: &str = "No accounts returned from provider.";
    /// User dismissed the approval prompt.
    pub const USER_REJECTED: &str = "Connection request was rejected.";
    /// Provider rejected without a usable message.
    pub const PROVIDER_ERROR_FALLBACK: &str = "Failed to connect wallet.";
}

// =============================================================================
// Address Display
// =============================================================================

/// Shortened address layout (`0x1234...5678`).
pub mod address_display {
    /// Leading characters kept (includes the `0x` prefix).
    pub const PREFIX_LEN: usize = 6;
    /// Trailing characters kept.
    pub const SUFFIX_LEN: usize = 4;
    /// Inserted between prefix and suffix.
    pub const SEPARATOR: &str = "...";
    /// Addresses shorter than this are shown in full.
    pub const MIN_SHORTEN_LEN: usize = PREFIX_LEN + SUFFIX_LEN;
}
