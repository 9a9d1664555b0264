//! Background context entry point
//!
//! Registers the command handler on `chrome.runtime.onMessage`. The loader
//! calls `run_background` once the module finished initializing.

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use xmsg_bridge::{Bridge, ContextBootstrap, ExecutionContext};

use crate::chrome::ChromeRuntime;
use crate::commands;
use crate::console::{self, ConsoleSink};
use crate::convert::js_error;

thread_local! {
    static BOOTSTRAP: Rc<ContextBootstrap<ConsoleSink>> =
        Rc::new(ContextBootstrap::new(ExecutionContext::Background, &console::logger()));
}

/// Start the background context.
///
/// Rejects if the messaging API is unavailable or the context was already
/// started; no listener is registered in either case.
#[wasm_bindgen]
pub async fn run_background() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let bootstrap = BOOTSTRAP.with(Rc::clone);
    let logger = console::logger();

    bootstrap
        .start(
            move || async move { ChromeRuntime::connect(&logger) },
            |host| {
                let bridge = Bridge::new(Rc::new(host), Rc::new(ConsoleSink), &console::config());
                bridge.register(commands::handle);
            },
        )
        .await
        .map_err(js_error)
}
