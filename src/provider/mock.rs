//! Scripted wallet provider for tests.
//!
//! Responses are queued ahead of time; each `request_accounts` call consumes
//! one. With nothing queued the request resolves with no accounts.

use std::cell::RefCell;
use std::collections::VecDeque;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use serde_json::Value;

use super::{AccountsChangedHandler, SubscriptionHandle, WalletProvider};
use crate::error::{ProviderFault, WalletError};
use crate::models::Account;

type AccountsResult = Result<Vec<Account>, ProviderFault>;

enum Scripted {
    Ready(AccountsResult),
    Deferred(oneshot::Receiver<AccountsResult>),
}

#[derive(Default)]
struct MockState {
    available: bool,
    responses: VecDeque<Scripted>,
    listeners: Vec<(u64, AccountsChangedHandler)>,
    next_id: u64,
    request_calls: usize,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
}

/// In-memory [`WalletProvider`] with call counters.
pub struct MockProvider {
    state: RefCell<MockState>,
}

/// Sender side of a deferred `request_accounts` response.
pub struct PendingRequest {
    sender: oneshot::Sender<AccountsResult>,
}

impl PendingRequest {
    pub fn resolve(self, accounts: &[&str]) {
        let accounts = accounts.iter().copied().map(Account::from).collect();
        let _ = self.sender.send(Ok(accounts));
    }

    pub fn reject(self, fault: ProviderFault) {
        let _ = self.sender.send(Err(fault));
    }
}

impl MockProvider {
    /// A provider that is present.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MockState {
                available: true,
                ..MockState::default()
            }),
        }
    }

    /// A provider that reports itself as absent.
    pub fn unavailable() -> Self {
        let mock = Self::new();
        mock.set_available(false);
        mock
    }

    pub fn set_available(&self, available: bool) {
        self.state.borrow_mut().available = available;
    }

    /// Queue a successful response.
    pub fn respond_with(&self, accounts: &[&str]) {
        let accounts = accounts.iter().copied().map(Account::from).collect();
        self.push(Scripted::Ready(Ok(accounts)));
    }

    /// Queue a rejection.
    pub fn reject_with(&self, fault: ProviderFault) {
        self.push(Scripted::Ready(Err(fault)));
    }

    /// Queue a response that stays pending until the returned sender fires.
    pub fn defer(&self) -> PendingRequest {
        let (sender, receiver) = oneshot::channel();
        self.push(Scripted::Deferred(receiver));
        PendingRequest { sender }
    }

    /// Deliver an accounts-changed event to every registered listener.
    pub fn emit_accounts_changed(&self, payload: Value) {
        // Listeners may call back into the provider.
        let listeners: Vec<AccountsChangedHandler> = self
            .state
            .borrow()
            .listeners
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in listeners {
            handler(payload.clone());
        }
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().request_calls
    }

    pub fn subscribe_count(&self) -> usize {
        self.state.borrow().subscribe_calls
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.state.borrow().unsubscribe_calls
    }

    pub fn active_listeners(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    fn push(&self, scripted: Scripted) {
        self.state.borrow_mut().responses.push_back(scripted);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletProvider for MockProvider {
    fn is_available(&self) -> bool {
        self.state.borrow().available
    }

    fn request_accounts(&self) -> LocalBoxFuture<'static, AccountsResult> {
        let mut state = self.state.borrow_mut();
        state.request_calls += 1;
        match state.responses.pop_front() {
            Some(Scripted::Ready(result)) => futures::future::ready(result).boxed_local(),
            Some(Scripted::Deferred(receiver)) => async move {
                receiver
                    .await
                    .unwrap_or_else(|_| Err(ProviderFault::with_message("request dropped")))
            }
            .boxed_local(),
            None => futures::future::ready(Ok(Vec::new())).boxed_local(),
        }
    }

    fn subscribe_accounts_changed(
        &self,
        handler: AccountsChangedHandler,
    ) -> Result<SubscriptionHandle, WalletError> {
        let mut state = self.state.borrow_mut();
        state.subscribe_calls += 1;
        state.next_id += 1;
        let id = state.next_id;
        state.listeners.push((id, handler));
        Ok(SubscriptionHandle::new(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut state = self.state.borrow_mut();
        state.unsubscribe_calls += 1;
        state.listeners.retain(|(id, _)| *id != handle.id());
    }
}
