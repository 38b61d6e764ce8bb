//! Injected browser wallet (EIP-1193) via web-sys.
//!
//! Talks to `window.ethereum` through the Reflect API. Listener closures are
//! kept alive per subscription and released on unsubscribe rather than leaked.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::Closure;
use wasm_bindgen_futures::JsFuture;

use super::{AccountsChangedHandler, SubscriptionHandle, WalletProvider};
use crate::config::{ACCOUNTS_CHANGED_EVENT, REQUEST_ACCOUNTS_METHOD};
use crate::error::{ProviderFault, WalletError};
use crate::models::Account;

/// Get the window.ethereum object injected by MetaMask.
fn get_ethereum() -> Result<Object, WalletError> {
    let window = web_sys::window().ok_or(WalletError::NoWindow)?;
    Reflect::get(&window, &"ethereum".into())
        .ok()
        .and_then(|v| v.dyn_into::<Object>().ok())
        .ok_or(WalletError::NotInstalled)
}

/// Look up a method on the provider object.
fn get_method(ethereum: &Object, name: &str) -> Option<Function> {
    Reflect::get(ethereum, &name.into())
        .ok()
        .and_then(|v| v.dyn_into::<Function>().ok())
}

/// Call ethereum.request({ method: ... }) and return the pending promise.
fn send_request(method: &str) -> Result<Promise, WalletError> {
    let ethereum = get_ethereum()?;

    let args = Object::new();
    Reflect::set(&args, &"method".into(), &method.into())
        .map_err(|_| WalletError::RequestCreationFailed)?;

    let request = get_method(&ethereum, "request").ok_or(WalletError::RequestCreationFailed)?;

    request
        .call1(&ethereum, &args)
        .map_err(|_| WalletError::RequestCreationFailed)?
        .dyn_into::<Promise>()
        .map_err(|_| WalletError::RequestCreationFailed)
}

/// Convert an arbitrary JS value into a JSON payload.
///
/// Arrays are converted element by element, so one unconvertible entry
/// (function, symbol, BigInt) becomes `null` without hiding the others.
fn payload_from_js(value: &JsValue) -> Value {
    if !Array::is_array(value) {
        return serde_wasm_bindgen::from_value(value.clone()).unwrap_or(Value::Null);
    }
    Value::Array(
        Array::from(value)
            .iter()
            .map(|item| serde_wasm_bindgen::from_value(item).unwrap_or(Value::Null))
            .collect(),
    )
}

/// Extract `{ code, message }` from a rejection value.
///
/// Some providers reject with a bare string, which is taken as the message.
fn fault_from_js(error: &JsValue) -> ProviderFault {
    if let Some(message) = error.as_string() {
        return ProviderFault::with_message(message);
    }

    let code = Reflect::get(error, &"code".into())
        .ok()
        .and_then(|v| v.as_f64())
        .map(|c| c as i64);
    let message = Reflect::get(error, &"message".into())
        .ok()
        .and_then(|v| v.as_string());

    ProviderFault { code, message }
}

/// Wallet injected at `window.ethereum`.
#[derive(Default)]
pub struct Eip1193Provider {
    listeners: RefCell<HashMap<u64, Closure<dyn Fn(JsValue)>>>,
    next_id: Cell<u64>,
}

impl Eip1193Provider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletProvider for Eip1193Provider {
    fn is_available(&self) -> bool {
        get_ethereum().is_ok()
    }

    fn request_accounts(&self) -> LocalBoxFuture<'static, Result<Vec<Account>, ProviderFault>> {
        let promise = match send_request(REQUEST_ACCOUNTS_METHOD) {
            Ok(promise) => promise,
            Err(e) => {
                return futures::future::ready(Err(ProviderFault::with_message(e.to_string())))
                    .boxed_local();
            }
        };

        async move {
            match JsFuture::from(promise).await {
                Ok(result) => Ok(Account::list_from_payload(&payload_from_js(&result))),
                Err(e) => Err(fault_from_js(&e)),
            }
        }
        .boxed_local()
    }

    fn subscribe_accounts_changed(
        &self,
        handler: AccountsChangedHandler,
    ) -> Result<SubscriptionHandle, WalletError> {
        let ethereum = get_ethereum()?;
        let on_fn = get_method(&ethereum, "on")
            .ok_or_else(|| WalletError::SubscriptionFailed("provider has no `on`".to_string()))?;

        let closure = Closure::wrap(Box::new(move |accounts: JsValue| {
            handler(payload_from_js(&accounts));
        }) as Box<dyn Fn(JsValue)>);

        on_fn
            .call2(&ethereum, &ACCOUNTS_CHANGED_EVENT.into(), closure.as_ref())
            .map_err(|e| {
                WalletError::SubscriptionFailed(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
            })?;

        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().insert(id, closure);
        Ok(SubscriptionHandle::new(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let Some(closure) = self.listeners.borrow_mut().remove(&handle.id()) else {
            return;
        };

        // Provider may be gone or lack removeListener; dropping the closure
        // afterwards is still required.
        if let Ok(ethereum) = get_ethereum()
            && let Some(remove_fn) = get_method(&ethereum, "removeListener")
        {
            let _ = remove_fn.call2(&ethereum, &ACCOUNTS_CHANGED_EVENT.into(), closure.as_ref());
        }
    }
}
