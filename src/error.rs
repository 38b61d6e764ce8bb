//! Error types for wallet operations.
//!
//! - [`WalletError`] - operational errors from the manager handle and the
//!   provider glue code
//! - [`ProviderFault`] - raw rejection reported by the wallet provider
//!
//! Classified connection failures that end up in state live in
//! [`crate::models::ErrorInfo`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wallet-related errors for the manager and EIP-1193 integration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Manager was torn down, or no wallet context was provided.
    #[error("Wallet manager not initialized")]
    NotInitialized,
    /// Browser window not available
    #[error("Browser window not available")]
    NoWindow,
    /// MetaMask or compatible wallet not installed
    #[error("MetaMask not installed. Please install MetaMask extension.")]
    NotInstalled,
    /// Failed to create request object
    #[error("Failed to create wallet request")]
    RequestCreationFailed,
    /// Provider refused the event listener registration
    #[error("Failed to subscribe to wallet events: {0}")]
    SubscriptionFailed(String),
}

/// A rejected provider request.
///
/// Mirrors the EIP-1193 `ProviderRpcError` shape where both fields are
/// optional in practice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFault {
    pub code: Option<i64>,
    pub message: Option<String>,
}

impl ProviderFault {
    pub fn new(code: Option<i64>, message: Option<impl Into<String>>) -> Self {
        Self {
            code,
            message: message.map(Into::into),
        }
    }

    /// Fault carrying only a code.
    pub fn with_code(code: i64) -> Self {
        Self {
            code: Some(code),
            message: None,
        }
    }

    /// Fault carrying only a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    /// The message, if present and non-empty.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

impl std::fmt::Display for ProviderFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.message()) {
            (Some(code), Some(msg)) => write!(f, "{} (code {})", msg, code),
            (Some(code), None) => write!(f, "provider error (code {})", code),
            (None, Some(msg)) => write!(f, "{}", msg),
            (None, None) => write!(f, "provider error"),
        }
    }
}

impl std::error::Error for ProviderFault {}
