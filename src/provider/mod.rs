//! Wallet provider capability.
//!
//! [`WalletProvider`] is the boundary between the connection manager and the
//! wallet software. The manager receives an implementation at construction
//! time and never reaches for `window.ethereum` itself.
//!
//! - [`Eip1193Provider`] - injected browser provider (wasm32 only)
//! - [`MockProvider`] - scripted provider for tests (`mock` feature)

#[cfg(target_arch = "wasm32")]
mod eip1193;
#[cfg(any(test, feature = "mock"))]
mod mock;

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::error::{ProviderFault, WalletError};
use crate::models::Account;

#[cfg(target_arch = "wasm32")]
pub use eip1193::Eip1193Provider;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockProvider, PendingRequest};

/// Callback invoked with the raw payload of an accounts-changed event.
///
/// The payload is untrusted; the manager validates it before use.
pub type AccountsChangedHandler = Rc<dyn Fn(Value)>;

/// Registration token for an accounts-changed listener.
///
/// Not `Clone`: it is handed back to [`WalletProvider::unsubscribe`] exactly
/// once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Operations the connection manager needs from a wallet provider.
pub trait WalletProvider {
    /// Whether the provider is present. Synchronous and side-effect free.
    fn is_available(&self) -> bool;

    /// Ask the wallet for account access.
    ///
    /// The request is issued when this method is called; the returned future
    /// only waits for the wallet's answer. No timeout is applied.
    fn request_accounts(&self) -> LocalBoxFuture<'static, Result<Vec<Account>, ProviderFault>>;

    /// Register `handler` for accounts-changed events.
    fn subscribe_accounts_changed(
        &self,
        handler: AccountsChangedHandler,
    ) -> Result<SubscriptionHandle, WalletError>;

    /// Remove a listener. Must tolerate a provider that has already gone away.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}
