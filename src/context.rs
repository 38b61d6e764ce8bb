//! Leptos integration.
//!
//! The root component creates one [`WalletManager`] and hands it to
//! [`provide_wallet`]. Descendants call [`use_wallet`], which fails with
//! [`WalletError::NotInitialized`] instead of falling back to defaults when
//! nothing was provided.
//!
//! ```ignore
//! #[component]
//! pub fn App() -> impl IntoView {
//!     provide_wallet(WalletManager::from_browser());
//!     view! { <Shell /> }
//! }
//! ```

use leptos::prelude::*;

use crate::error::WalletError;
use crate::manager::{WalletHandle, WalletManager};
use crate::models::WalletSnapshot;

/// Wallet access for components.
///
/// `Copy` because both fields are arena handles. The manager is owned by the
/// reactive owner that called [`provide_wallet`] and is torn down with it.
#[derive(Clone, Copy)]
pub struct WalletContext {
    manager: StoredValue<WalletManager, LocalStorage>,
    /// Latest state, updated after every transition.
    pub snapshot: RwSignal<WalletSnapshot>,
}

impl WalletContext {
    /// Handle to the underlying manager.
    pub fn handle(&self) -> Result<WalletHandle, WalletError> {
        self.manager
            .try_with_value(WalletManager::handle)
            .ok_or(WalletError::NotInitialized)
    }

    /// Start a connect attempt on the local executor.
    pub fn connect(&self) -> Result<(), WalletError> {
        let attempt = self.handle()?.connect()?;
        wasm_bindgen_futures::spawn_local(attempt);
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), WalletError> {
        self.handle()?.disconnect()
    }

    pub fn clear_error(&self) -> Result<(), WalletError> {
        self.handle()?.clear_error()
    }
}

/// Store `manager` in the current reactive owner and expose it as context.
pub fn provide_wallet(manager: WalletManager) -> WalletContext {
    let snapshot = RwSignal::new(manager.snapshot());
    manager.on_change(move |snap| {
        // Signal is gone once the owner is disposed.
        let _ = snapshot.try_set(snap.clone());
    });

    let ctx = WalletContext {
        manager: StoredValue::new_local(manager),
        snapshot,
    };
    provide_context(ctx);
    ctx
}

/// Wallet context provided by an ancestor.
pub fn use_wallet() -> Result<WalletContext, WalletError> {
    use_context::<WalletContext>().ok_or(WalletError::NotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use crate::provider::MockProvider;
    use std::rc::Rc;

    const ADDR: &str = "0xABCDEF1234567890000000000000000000000001";

    #[test]
    fn test_use_wallet_without_provider() {
        assert_eq!(use_wallet().err(), Some(WalletError::NotInitialized));
    }

    #[test]
    fn test_snapshot_signal_follows_manager() {
        let owner = Owner::new();
        owner.with(|| {
            let mock = Rc::new(MockProvider::new());
            provide_wallet(WalletManager::new(mock.clone()));

            let ctx = use_wallet().unwrap();
            assert!(ctx.snapshot.get_untracked().is_capability_available);

            mock.emit_accounts_changed(serde_json::json!([ADDR]));
            let snap = ctx.snapshot.get_untracked();
            assert_eq!(snap.account, Some(Account::from(ADDR)));
            assert_eq!(snap.formatted_address, "0xABCD...0001");

            ctx.disconnect().unwrap();
            assert_eq!(ctx.snapshot.get_untracked().account, None);
        });
    }
}
