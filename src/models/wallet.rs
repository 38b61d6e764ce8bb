use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{USER_REJECTED_CODE, messages};
use crate::error::ProviderFault;
use crate::utils::format_address;

// ============================================================================
// Account
// ============================================================================

/// A wallet address as reported by the provider.
///
/// Opaque: no checksum or length validation is performed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened display form (0x1234...5678).
    pub fn formatted(&self) -> String {
        format_address(&self.0)
    }

    /// Accounts from an untyped provider payload.
    ///
    /// Returns the leading run of string elements of an array payload, so a
    /// payload is usable exactly when its first element is a string. Anything
    /// that is not an array yields no accounts.
    pub fn list_from_payload(payload: &Value) -> Vec<Account> {
        match payload {
            Value::Array(items) => items
                .iter()
                .map_while(Value::as_str)
                .map(Account::new)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Account {
    fn from(address: String) -> Self {
        Self(address)
    }
}

// ============================================================================
// ErrorInfo
// ============================================================================

/// Classification of a failed connection attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UserRejected,
    ProviderUnavailable,
    NoAccountsReturned,
    ProviderError(String),
}

/// A classified connection failure with a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn user_rejected() -> Self {
        Self {
            kind: ErrorKind::UserRejected,
            message: messages::USER_REJECTED.to_string(),
        }
    }

    pub fn provider_unavailable() -> Self {
        Self {
            kind: ErrorKind::ProviderUnavailable,
            message: messages::PROVIDER_UNAVAILABLE.to_string(),
        }
    }

    pub fn no_accounts_returned() -> Self {
        Self {
            kind: ErrorKind::NoAccountsReturned,
            message: messages::NO_ACCOUNTS_RETURNED.to_string(),
        }
    }

    pub fn provider_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::ProviderError(message.clone()),
            message,
        }
    }

    /// Classify a rejected account request.
    ///
    /// The user-rejection code wins over any message the provider attached.
    pub fn from_fault(fault: &ProviderFault) -> Self {
        if fault.code == Some(USER_REJECTED_CODE) {
            return Self::user_rejected();
        }
        Self::provider_error(fault.message().unwrap_or(messages::PROVIDER_ERROR_FALLBACK))
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Wallet connection state
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Account),
    /// Last attempt failed. `account` is the account that was connected
    /// before the attempt started, if any.
    Failed {
        account: Option<Account>,
        error: ErrorInfo,
    },
}

/// Inputs to the connection state machine.
///
/// Connect outcomes carry the account held before the attempt started so a
/// failed reconnect keeps showing it.
#[derive(Clone, Debug, PartialEq)]
pub enum StateEvent {
    /// `connect()` with a provider present.
    ConnectStarted,
    /// `connect()` without a provider.
    ProviderMissing { previous: Option<Account> },
    /// Account request resolved.
    AccountsReturned {
        accounts: Vec<Account>,
        previous: Option<Account>,
    },
    /// Account request rejected.
    RequestRejected {
        fault: ProviderFault,
        previous: Option<Account>,
    },
    /// Connect future dropped before the provider answered.
    ConnectAbandoned { previous: Option<Account> },
    /// `disconnect()`.
    DisconnectRequested,
    /// Provider-initiated account change with its raw payload.
    AccountsChanged(Value),
    /// `clearError()`.
    ErrorCleared,
}

impl ConnectionState {
    /// Apply an event, producing the next state.
    ///
    /// Total over every (state, event) pair. Callers decide whether an event
    /// is admissible (re-entrancy and stale resolutions are filtered by the
    /// manager before reaching here).
    pub fn next(&self, event: StateEvent) -> ConnectionState {
        match event {
            StateEvent::ConnectStarted => ConnectionState::Connecting,
            StateEvent::ProviderMissing { previous } => ConnectionState::Failed {
                account: previous,
                error: ErrorInfo::provider_unavailable(),
            },
            StateEvent::AccountsReturned { accounts, previous } => {
                match accounts.into_iter().next() {
                    Some(first) => ConnectionState::Connected(first),
                    None => ConnectionState::Failed {
                        account: previous,
                        error: ErrorInfo::no_accounts_returned(),
                    },
                }
            }
            StateEvent::RequestRejected { fault, previous } => ConnectionState::Failed {
                account: previous,
                error: ErrorInfo::from_fault(&fault),
            },
            StateEvent::ConnectAbandoned { previous } => match previous {
                Some(account) => ConnectionState::Connected(account),
                None => ConnectionState::Disconnected,
            },
            StateEvent::DisconnectRequested => ConnectionState::Disconnected,
            StateEvent::AccountsChanged(payload) => {
                match Account::list_from_payload(&payload).into_iter().next() {
                    Some(first) => ConnectionState::Connected(first),
                    None => ConnectionState::Disconnected,
                }
            }
            StateEvent::ErrorCleared => match self {
                ConnectionState::Failed {
                    account: Some(account),
                    ..
                } => ConnectionState::Connected(account.clone()),
                ConnectionState::Failed { account: None, .. } => ConnectionState::Disconnected,
                other => other.clone(),
            },
        }
    }

    /// The account to display, if any.
    ///
    /// A failed reconnect still reports the previously connected account.
    pub fn account(&self) -> Option<&Account> {
        match self {
            ConnectionState::Connected(account) => Some(account),
            ConnectionState::Failed { account, .. } => account.as_ref(),
            ConnectionState::Disconnected | ConnectionState::Connecting => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            ConnectionState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Connecting)
    }

    /// Check if wallet is connected
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    /// Shortened account address, or empty string without an account.
    pub fn formatted_address(&self) -> String {
        self.account().map(Account::formatted).unwrap_or_default()
    }
}

// ============================================================================
// WalletSnapshot
// ============================================================================

/// Read-only view of the manager state handed to consumers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub account: Option<Account>,
    pub formatted_address: String,
    pub is_connecting: bool,
    pub error: Option<ErrorInfo>,
    pub is_capability_available: bool,
}

impl WalletSnapshot {
    pub fn new(state: &ConnectionState, is_capability_available: bool) -> Self {
        Self {
            account: state.account().cloned(),
            formatted_address: state.formatted_address(),
            is_connecting: state.is_connecting(),
            error: state.error().cloned(),
            is_capability_available,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some() && self.error.is_none() && !self.is_connecting
    }

    /// Whether a connect affordance should be enabled.
    pub fn can_connect(&self) -> bool {
        self.is_capability_available && !self.is_connecting
    }

    /// Label for a connect button.
    pub fn status_label(&self) -> &'static str {
        if self.is_connecting {
            "Connecting..."
        } else if self.account.is_some() {
            "Connected"
        } else {
            "Connect"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDR_A: &str = "0x1234567890123456789012345678901234567890";
    const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn connected(addr: &str) -> ConnectionState {
        ConnectionState::Connected(Account::from(addr))
    }

    #[test]
    fn test_default() {
        let state = ConnectionState::default();
        assert_eq!(state, ConnectionState::Disconnected);
        assert_eq!(state.account(), None);
        assert_eq!(state.formatted_address(), "");
    }

    #[test]
    fn test_connecting_state() {
        let state = ConnectionState::Connecting;
        assert!(state.is_connecting());
        assert!(!state.is_connected());
        assert_eq!(state.error(), None);
    }

    #[test]
    fn test_connected_state() {
        let state = connected(ADDR_A);
        assert!(state.is_connected());
        assert_eq!(state.account().map(Account::as_str), Some(ADDR_A));
        assert_eq!(state.formatted_address(), "0x1234...7890");
    }

    #[test]
    fn test_accounts_returned_keeps_first() {
        let state = ConnectionState::Connecting.next(StateEvent::AccountsReturned {
            accounts: vec![Account::from(ADDR_A), Account::from(ADDR_B)],
            previous: None,
        });
        assert_eq!(state, connected(ADDR_A));
    }

    #[test]
    fn test_empty_accounts_fail() {
        let state = ConnectionState::Connecting.next(StateEvent::AccountsReturned {
            accounts: vec![],
            previous: None,
        });
        assert_eq!(
            state.error().map(|e| &e.kind),
            Some(&ErrorKind::NoAccountsReturned)
        );
        assert_eq!(state.account(), None);
    }

    #[test]
    fn test_classify_user_rejection() {
        let info = ErrorInfo::from_fault(&ProviderFault::new(Some(4001), Some("User denied")));
        assert_eq!(info.kind, ErrorKind::UserRejected);
        assert_eq!(info.message, "Connection request was rejected.");
    }

    #[test]
    fn test_classify_provider_error() {
        let info = ErrorInfo::from_fault(&ProviderFault::new(Some(-32002), Some("Already pending")));
        assert_eq!(info.kind, ErrorKind::ProviderError("Already pending".to_string()));
        assert_eq!(info.to_string(), "Already pending");

        let info = ErrorInfo::from_fault(&ProviderFault::default());
        assert_eq!(info.message, "Failed to connect wallet.");

        let info = ErrorInfo::from_fault(&ProviderFault::with_message(""));
        assert_eq!(info.message, "Failed to connect wallet.");
    }

    #[test]
    fn test_failed_reconnect_keeps_previous_account() {
        let state = ConnectionState::Connecting.next(StateEvent::RequestRejected {
            fault: ProviderFault::with_code(4001),
            previous: Some(Account::from(ADDR_A)),
        });
        assert_eq!(state.account().map(Account::as_str), Some(ADDR_A));
        assert!(!state.is_connected());

        assert_eq!(state.next(StateEvent::ErrorCleared), connected(ADDR_A));
    }

    #[test]
    fn test_clear_error() {
        let failed = ConnectionState::Disconnected.next(StateEvent::ProviderMissing { previous: None });
        assert_eq!(failed.error(), Some(&ErrorInfo::provider_unavailable()));
        assert_eq!(
            failed.next(StateEvent::ErrorCleared),
            ConnectionState::Disconnected
        );

        // No error to clear: unchanged.
        assert_eq!(
            connected(ADDR_A).next(StateEvent::ErrorCleared),
            connected(ADDR_A)
        );
        assert_eq!(
            ConnectionState::Connecting.next(StateEvent::ErrorCleared),
            ConnectionState::Connecting
        );
    }

    #[test]
    fn test_accounts_changed_payloads() {
        let cases = [
            (json!([ADDR_B]), connected(ADDR_B)),
            (json!([ADDR_B, ADDR_A]), connected(ADDR_B)),
            (json!([]), ConnectionState::Disconnected),
            (json!([42, ADDR_A]), ConnectionState::Disconnected),
            (json!(ADDR_A), ConnectionState::Disconnected),
            (Value::Null, ConnectionState::Disconnected),
        ];
        for (payload, expected) in cases {
            let state = connected(ADDR_A).next(StateEvent::AccountsChanged(payload.clone()));
            assert_eq!(state, expected, "payload {}", payload);
        }
    }

    #[test]
    fn test_abandoned_connect_restores_previous() {
        let state = ConnectionState::Connecting.next(StateEvent::ConnectAbandoned {
            previous: Some(Account::from(ADDR_A)),
        });
        assert_eq!(state, connected(ADDR_A));

        let state =
            ConnectionState::Connecting.next(StateEvent::ConnectAbandoned { previous: None });
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_accounts_changed_overrides_connecting() {
        let state = ConnectionState::Connecting.next(StateEvent::AccountsChanged(json!([ADDR_B])));
        assert_eq!(state, connected(ADDR_B));
    }

    #[test]
    fn test_disconnect_from_every_state() {
        let states = [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            connected(ADDR_A),
            ConnectionState::Failed {
                account: Some(Account::from(ADDR_A)),
                error: ErrorInfo::user_rejected(),
            },
        ];
        for state in states {
            let next = state.next(StateEvent::DisconnectRequested);
            assert_eq!(next, ConnectionState::Disconnected);
            assert_eq!(next.account(), None);
            assert_eq!(next.error(), None);
        }
    }

    #[test]
    fn test_snapshot_labels() {
        let snap = WalletSnapshot::new(&ConnectionState::Disconnected, true);
        assert!(snap.can_connect());
        assert_eq!(snap.status_label(), "Connect");

        let snap = WalletSnapshot::new(&ConnectionState::Connecting, true);
        assert!(!snap.can_connect());
        assert_eq!(snap.status_label(), "Connecting...");

        let snap = WalletSnapshot::new(&connected(ADDR_A), true);
        assert!(snap.is_connected());
        assert_eq!(snap.formatted_address, "0x1234...7890");
        assert_eq!(snap.status_label(), "Connected");

        let snap = WalletSnapshot::new(&ConnectionState::Disconnected, false);
        assert!(!snap.can_connect());

        let failed = ConnectionState::Failed {
            account: Some(Account::from(ADDR_A)),
            error: ErrorInfo::user_rejected(),
        };
        let snap = WalletSnapshot::new(&failed, true);
        assert!(!snap.is_connected());
        assert_eq!(snap.status_label(), "Connected");
    }

    #[test]
    fn test_error_kind_serialization() {
        let value = serde_json::to_value(ErrorInfo::user_rejected()).unwrap();
        assert_eq!(value["kind"], "UserRejected");
        assert_eq!(value["message"], "Connection request was rejected.");
    }
}
