//! Content context entry point
//!
//! Holds the content side of the bridge and exposes `sendMessage` to the
//! page-facing script. On start it pings the background and logs whether an
//! answer came back.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use xmsg_bridge::{Bridge, ContextBootstrap, ExecutionContext};

use crate::chrome::ChromeRuntime;
use crate::console::{self, ConsoleSink};
use crate::constants::{PING_COMMAND, PONG};
use crate::convert::{self, js_error};

type ContentBridge = Bridge<ChromeRuntime, ConsoleSink>;

thread_local! {
    static BOOTSTRAP: Rc<ContextBootstrap<ConsoleSink>> =
        Rc::new(ContextBootstrap::new(ExecutionContext::Content, &console::logger()));
    static BRIDGE: RefCell<Option<ContentBridge>> = const { RefCell::new(None) };
}

fn bridge() -> Option<ContentBridge> {
    BRIDGE.with(|bridge| bridge.borrow().clone())
}

/// Start the content context, then check that the background answers.
///
/// Only initialization failures reject; an unreachable background is logged
/// and the context stays usable.
#[wasm_bindgen]
pub async fn run_content() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let bootstrap = BOOTSTRAP.with(Rc::clone);
    let logger = console::logger();

    bootstrap
        .start(
            move || async move { ChromeRuntime::connect(&logger) },
            |host| {
                let bridge = Bridge::new(Rc::new(host), Rc::new(ConsoleSink), &console::config());
                BRIDGE.with(|slot| *slot.borrow_mut() = Some(bridge));
            },
        )
        .await
        .map_err(js_error)?;

    if let Some(bridge) = bridge() {
        ping(&bridge).await;
    }
    Ok(())
}

async fn ping(bridge: &ContentBridge) {
    let logger = bridge.logger().scoped("content");
    match bridge.send(json!({ "cmd": PING_COMMAND })).await {
        Ok(Some(Value::String(reply))) if reply == PONG => {
            logger.info("Background is reachable");
        }
        Ok(other) => logger.warn(format!("Unexpected ping reply: {:?}", other)),
        Err(e) => logger.warn(format!("Background unreachable: {}", e)),
    }
}

/// Send `message` to the background and resolve with its reply.
///
/// Resolves `undefined` when the background answered with nothing (including
/// when its handler failed); rejects with the host's message when delivery
/// failed.
#[wasm_bindgen(js_name = sendMessage)]
pub async fn send_message(message: JsValue) -> Result<JsValue, JsValue> {
    let bridge = bridge().ok_or_else(|| js_error("content context is not running"))?;
    let message = convert::from_js(&message).map_err(js_error)?;

    let reply = bridge
        .send(message.unwrap_or(Value::Null))
        .await
        .map_err(js_error)?;
    Ok(convert::reply_to_js(reply))
}
