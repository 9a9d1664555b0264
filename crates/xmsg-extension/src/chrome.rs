//! chrome.runtime host transport
//!
//! Implements `HostTransport` on top of the extension runtime's one-shot
//! messaging:
//!
//! - `deliver` -> `chrome.runtime.sendMessage(message, callback)`, with
//!   `chrome.runtime.lastError` read inside the callback
//! - `add_listener` -> `chrome.runtime.onMessage.addListener(fn)`, where the
//!   listener's boolean return keeps the reply channel open
//! - `spawn_local` -> `wasm_bindgen_futures::spawn_local`
//!
//! Closures handed to the runtime are released to the JS garbage collector
//! (`into_js_value`); listeners stay registered for the life of the context.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use xmsg_bridge::Logger;
use xmsg_hal::{Completion, HostError, HostTransport, Listener, LocalTask, ReplyFn, SenderMetadata};

use crate::console::ConsoleSink;
use crate::convert::{self, describe_js_error};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    fn send_message_js(message: &JsValue, callback: &js_sys::Function) -> Result<(), JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn add_listener_js(listener: &js_sys::Function);
}

/// Host transport backed by `chrome.runtime`
pub struct ChromeRuntime {
    logger: Logger<ConsoleSink>,
}

impl ChromeRuntime {
    /// Check that the messaging API is reachable from this context.
    ///
    /// Fails outside an extension (e.g. the module loaded by a plain page)
    /// or after the extension context was invalidated.
    pub fn connect(logger: &Logger<ConsoleSink>) -> Result<Self, HostError> {
        let runtime = runtime_object()?;

        let send = get(&runtime, "sendMessage")?;
        if !send.is_function() {
            return Err(HostError::new("chrome.runtime.sendMessage is not available"));
        }
        let on_message = get(&runtime, "onMessage")?;
        if on_message.is_undefined() || on_message.is_null() {
            return Err(HostError::new("chrome.runtime.onMessage is not available"));
        }

        Ok(Self {
            logger: logger.scoped("chrome"),
        })
    }
}

impl HostTransport for ChromeRuntime {
    fn deliver(&self, message: Value, on_complete: Completion) {
        let on_complete = Rc::new(RefCell::new(on_complete));

        let payload = match convert::to_js(&message) {
            Ok(payload) => payload,
            Err(e) => {
                complete_with(&on_complete, Err(HostError::new(e)));
                return;
            }
        };

        let complete = on_complete.clone();
        let callback = Closure::wrap(Box::new(move |response: JsValue| {
            // lastError is only defined while this callback runs
            let outcome = match last_error() {
                Some(message) => Err(HostError::new(message)),
                None => convert::from_js(&response).map_err(HostError::new),
            };
            complete_with(&complete, outcome);
        }) as Box<dyn FnMut(JsValue)>);

        let callback = callback.into_js_value();
        if let Err(thrown) = send_message_js(&payload, callback.unchecked_ref()) {
            let message = describe_js_error(&thrown);
            self.logger.debug(format!("sendMessage threw: {}", message));
            complete_with(&on_complete, Err(HostError::new(message)));
        }
    }

    fn add_listener(&self, listener: Listener) {
        let logger = self.logger.clone();

        let closure = Closure::wrap(Box::new(
            move |message: JsValue, sender: JsValue, send_response: js_sys::Function| -> JsValue {
                let mut reply: ReplyFn = Box::new(move |response: Option<Value>| {
                    let _ = send_response.call1(&JsValue::NULL, &convert::reply_to_js(response));
                });

                let message = match convert::from_js(&message) {
                    Ok(message) => message.unwrap_or(Value::Null),
                    Err(e) => {
                        logger.error(format!("Dropping unreadable message: {}", e));
                        reply(None);
                        return JsValue::FALSE;
                    }
                };
                let sender = convert::from_js(&sender)
                    .ok()
                    .flatten()
                    .map(SenderMetadata::from_value)
                    .unwrap_or_default();

                JsValue::from_bool(listener(message, sender, reply).keeps_open())
            },
        )
            as Box<dyn FnMut(JsValue, JsValue, js_sys::Function) -> JsValue>);

        add_listener_js(closure.into_js_value().unchecked_ref());
    }

    fn spawn_local(&self, task: LocalTask) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

// === Runtime object helpers ===

fn complete_with(on_complete: &RefCell<Completion>, outcome: Result<Option<Value>, HostError>) {
    let mut complete = on_complete.borrow_mut();
    (*complete)(outcome);
}

fn runtime_object() -> Result<JsValue, HostError> {
    let chrome = get(&js_sys::global(), "chrome")?;
    if chrome.is_undefined() || chrome.is_null() {
        return Err(HostError::new("chrome is not defined in this context"));
    }
    let runtime = get(&chrome, "runtime")?;
    if runtime.is_undefined() || runtime.is_null() {
        return Err(HostError::new("chrome.runtime is not defined in this context"));
    }
    Ok(runtime)
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, HostError> {
    js_sys::Reflect::get(target, &JsValue::from_str(key))
        .map_err(|e| HostError::new(describe_js_error(&e)))
}

/// `chrome.runtime.lastError`, if set
fn last_error() -> Option<String> {
    let runtime = runtime_object().ok()?;
    let error = get(&runtime, "lastError").ok()?;
    if error.is_undefined() || error.is_null() {
        None
    } else {
        Some(describe_js_error(&error))
    }
}
