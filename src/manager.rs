//! Wallet connection manager.
//!
//! Owns the authoritative [`ConnectionState`] and serializes the two sources
//! that change it: commands issued by the UI (`connect`, `disconnect`,
//! `clear_error`) and accounts-changed events pushed by the provider.
//!
//! # Concurrency
//!
//! Everything runs on one thread. State lives in a single `RefCell` that is
//! never borrowed across a provider call or a listener callback, so each
//! transition is applied whole, in arrival order. The only suspension point
//! is the account request; at most one is tracked at a time, and a result
//! that arrives for anything but the current attempt is discarded.
//!
//! # Lifetime
//!
//! The manager subscribes to accounts-changed on construction and
//! unsubscribes exactly once on [`WalletManager::teardown`] or drop.
//! Connect futures and [`WalletHandle`]s only hold weak references, so work
//! finishing after teardown cannot write state.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::{debug, info, warn};
use serde_json::Value;

use crate::error::{ProviderFault, WalletError};
use crate::models::{Account, ConnectionState, ErrorInfo, StateEvent, WalletSnapshot};
use crate::provider::{AccountsChangedHandler, SubscriptionHandle, WalletProvider};

type Listener = Rc<dyn Fn(&WalletSnapshot)>;

/// In-flight account request.
struct Attempt {
    id: u64,
    /// Account held when the attempt started.
    previous: Option<Account>,
}

#[derive(Default)]
struct Core {
    state: ConnectionState,
    attempt: Option<Attempt>,
    attempts_started: u64,
    subscription: Option<SubscriptionHandle>,
    torn_down: bool,
}

struct Shared {
    provider: Rc<dyn WalletProvider>,
    core: RefCell<Core>,
    listeners: RefCell<Vec<Listener>>,
}

impl Shared {
    fn is_live(&self) -> bool {
        !self.core.borrow().torn_down
    }

    fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot::new(&self.core.borrow().state, self.provider.is_available())
    }

    /// Apply one event and notify listeners. No-op after teardown.
    fn apply(&self, event: StateEvent) {
        let snapshot = {
            let mut core = self.core.borrow_mut();
            if core.torn_down {
                return;
            }

            let next = core.state.next(event);
            if next != core.state {
                debug!("wallet state: {:?} -> {:?}", core.state, next);
            }
            core.state = next;
            if !core.state.is_connecting() {
                core.attempt = None;
            }
            WalletSnapshot::new(&core.state, self.provider.is_available())
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &WalletSnapshot) {
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(snapshot);
        }
    }

    /// Synchronous half of `connect`: guards, state change, request issue.
    fn begin_connect(&self) -> Option<(u64, LocalBoxFuture<'static, AccountsResult>)> {
        let previous = {
            let core = self.core.borrow();
            if core.torn_down {
                warn!("connect called after teardown");
                return None;
            }
            if core.state.is_connecting() {
                debug!("connect ignored: request already in flight");
                return None;
            }
            core.state.account().cloned()
        };

        if !self.provider.is_available() {
            info!("wallet provider not available");
            self.apply(StateEvent::ProviderMissing { previous });
            return None;
        }

        let id = {
            let mut core = self.core.borrow_mut();
            core.attempts_started += 1;
            core.attempts_started
        };
        self.apply(StateEvent::ConnectStarted);
        {
            // A listener may have moved the state on already.
            let mut core = self.core.borrow_mut();
            if !core.state.is_connecting() {
                debug!("connect attempt {} superseded before request", id);
                return None;
            }
            core.attempt = Some(Attempt { id, previous });
        }

        info!("requesting wallet accounts (attempt {})", id);
        Some((id, self.provider.request_accounts()))
    }

    /// Asynchronous half of `connect`: apply the provider's answer if the
    /// attempt is still current.
    fn finish_connect(&self, id: u64, result: AccountsResult) {
        let previous = {
            let mut core = self.core.borrow_mut();
            if core.torn_down {
                debug!("account request {} resolved after teardown", id);
                return;
            }
            match core.attempt.take() {
                Some(attempt) if attempt.id == id => attempt.previous,
                other => {
                    core.attempt = other;
                    warn!("discarding stale account request result (attempt {})", id);
                    return;
                }
            }
        };

        let event = match result {
            Ok(accounts) => {
                if let Some(first) = accounts.first() {
                    info!("wallet connected: {}", first.formatted());
                }
                StateEvent::AccountsReturned { accounts, previous }
            }
            Err(fault) => {
                warn!("account request rejected: {}", fault);
                StateEvent::RequestRejected { fault, previous }
            }
        };
        self.apply(event);
    }

    /// The connect future for `id` was dropped unresolved. Leaves
    /// `Connecting` so later `connect()` calls are not swallowed.
    fn abandon_connect(&self, id: u64) {
        let previous = {
            let mut core = self.core.borrow_mut();
            if core.torn_down {
                return;
            }
            match core.attempt.take() {
                Some(attempt) if attempt.id == id => attempt.previous,
                other => {
                    core.attempt = other;
                    return;
                }
            }
        };
        warn!("connect attempt {} dropped before the provider answered", id);
        self.apply(StateEvent::ConnectAbandoned { previous });
    }

    fn handle_accounts_changed(&self, payload: Value) {
        let accounts = Account::list_from_payload(&payload);
        match accounts.first() {
            Some(first) => debug!("accounts changed: {}", first.formatted()),
            None if payload.as_array().is_some_and(Vec::is_empty) => {
                debug!("accounts changed: wallet locked or disconnected")
            }
            None => warn!("malformed accountsChanged payload: {}", payload),
        }
        self.apply(StateEvent::AccountsChanged(payload));
    }

    fn teardown(&self) {
        let subscription = {
            let mut core = self.core.borrow_mut();
            if core.torn_down {
                return;
            }
            core.torn_down = true;
            core.attempt = None;
            core.subscription.take()
        };
        self.listeners.borrow_mut().clear();

        if let Some(handle) = subscription {
            self.provider.unsubscribe(handle);
        }
        debug!("wallet manager torn down");
    }
}

type AccountsResult = Result<Vec<Account>, ProviderFault>;

/// Rolls back the attempt if the connect future is dropped before the
/// provider answers.
struct AttemptGuard {
    shared: Weak<Shared>,
    id: u64,
    settled: bool,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if !self.settled
            && let Some(shared) = self.shared.upgrade()
        {
            shared.abandon_connect(self.id);
        }
    }
}

/// Start a connect attempt against `shared`.
///
/// The guard checks and the request itself happen before this returns; the
/// returned future only applies the outcome.
fn connect(shared: &Rc<Shared>) -> LocalBoxFuture<'static, ()> {
    let Some((id, request)) = shared.begin_connect() else {
        return futures::future::ready(()).boxed_local();
    };
    let mut guard = AttemptGuard {
        shared: Rc::downgrade(shared),
        id,
        settled: false,
    };
    async move {
        let result = request.await;
        guard.settled = true;
        match guard.shared.upgrade() {
            Some(shared) => shared.finish_connect(id, result),
            None => debug!("account request {} resolved after manager dropped", id),
        }
    }
    .boxed_local()
}

// ============================================================================
// WalletManager
// ============================================================================

/// Owner of the wallet connection state.
///
/// Create one per application session and pass [`WalletHandle`]s (or the
/// Leptos context) to consumers. Dropping the manager tears it down.
pub struct WalletManager {
    shared: Rc<Shared>,
}

impl WalletManager {
    /// Create a manager and subscribe to account changes if the provider is
    /// present.
    pub fn new(provider: Rc<dyn WalletProvider>) -> Self {
        let shared = Rc::new(Shared {
            provider,
            core: RefCell::new(Core::default()),
            listeners: RefCell::new(Vec::new()),
        });

        if shared.provider.is_available() {
            let weak = Rc::downgrade(&shared);
            let handler: AccountsChangedHandler = Rc::new(move |payload| {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_accounts_changed(payload);
                }
            });
            match shared.provider.subscribe_accounts_changed(handler) {
                Ok(handle) => shared.core.borrow_mut().subscription = Some(handle),
                Err(e) => warn!("account change notifications unavailable: {}", e),
            }
        }

        Self { shared }
    }

    /// Manager backed by the browser's injected provider.
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        Self::new(Rc::new(crate::provider::Eip1193Provider::new()))
    }

    /// A weak handle for consumers.
    pub fn handle(&self) -> WalletHandle {
        WalletHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Request account access.
    ///
    /// State changes synchronously: to `Connecting` when a request is
    /// issued, or straight to `Failed` when no provider is present. Calling
    /// this while already connecting issues nothing. The returned future
    /// completes once the provider answers and must be polled (or spawned)
    /// for the answer to be applied. Dropping it early abandons the attempt
    /// and restores the state held before it started.
    #[must_use = "the provider's answer is only applied while the future is polled"]
    pub fn connect(&self) -> LocalBoxFuture<'static, ()> {
        connect(&self.shared)
    }

    /// Forget the connected account locally. The provider is not contacted.
    pub fn disconnect(&self) {
        info!("wallet disconnected");
        self.shared.apply(StateEvent::DisconnectRequested);
    }

    /// Drop the current error, if any.
    pub fn clear_error(&self) {
        self.shared.apply(StateEvent::ErrorCleared);
    }

    /// Register a listener called after every state transition.
    pub fn on_change(&self, listener: impl Fn(&WalletSnapshot) + 'static) {
        if self.shared.is_live() {
            self.shared.listeners.borrow_mut().push(Rc::new(listener));
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.core.borrow().state.clone()
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        self.shared.snapshot()
    }

    pub fn account(&self) -> Option<Account> {
        self.shared.core.borrow().state.account().cloned()
    }

    pub fn formatted_address(&self) -> String {
        self.shared.core.borrow().state.formatted_address()
    }

    pub fn is_connecting(&self) -> bool {
        self.shared.core.borrow().state.is_connecting()
    }

    pub fn error(&self) -> Option<ErrorInfo> {
        self.shared.core.borrow().state.error().cloned()
    }

    pub fn is_capability_available(&self) -> bool {
        self.shared.provider.is_available()
    }

    /// Unsubscribe from the provider and stop accepting transitions.
    ///
    /// Idempotent; also runs on drop. The last state stays readable.
    pub fn teardown(&self) {
        self.shared.teardown();
    }
}

impl Drop for WalletManager {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

// ============================================================================
// WalletHandle
// ============================================================================

/// Cheap, clonable reference to a [`WalletManager`].
///
/// Every call fails with [`WalletError::NotInitialized`] once the manager has
/// been torn down.
#[derive(Clone)]
pub struct WalletHandle {
    shared: Weak<Shared>,
}

impl WalletHandle {
    fn shared(&self) -> Result<Rc<Shared>, WalletError> {
        self.shared
            .upgrade()
            .filter(|shared| shared.is_live())
            .ok_or(WalletError::NotInitialized)
    }

    #[must_use = "the provider's answer is only applied while the future is polled"]
    pub fn connect(&self) -> Result<LocalBoxFuture<'static, ()>, WalletError> {
        Ok(connect(&self.shared()?))
    }

    pub fn disconnect(&self) -> Result<(), WalletError> {
        let shared = self.shared()?;
        info!("wallet disconnected");
        shared.apply(StateEvent::DisconnectRequested);
        Ok(())
    }

    pub fn clear_error(&self) -> Result<(), WalletError> {
        self.shared()?.apply(StateEvent::ErrorCleared);
        Ok(())
    }

    pub fn state(&self) -> Result<ConnectionState, WalletError> {
        Ok(self.shared()?.core.borrow().state.clone())
    }

    pub fn snapshot(&self) -> Result<WalletSnapshot, WalletError> {
        Ok(self.shared()?.snapshot())
    }
}
