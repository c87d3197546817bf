//! RevProject Dashboard
//!
//! Browser front end for the workspace dashboard, compiled to WebAssembly.
//!
//! # Architecture
//!
//! The page markup is rendered by the server. This crate binds the
//! presentation core to it: [`dom::DomPage`] exposes the page surfaces,
//! [`fetch::GlooTransport`] talks to the API with the session cookie, and
//! [`events`] routes DOM events into the application context.

use std::rc::Rc;

use wasm_bindgen_futures::spawn_local;

use revdash::{AppContext, Config, PageHost, SystemClock};

mod console;
mod dom;
mod events;
mod fetch;

fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();
    console::init();

    let Some(page) = dom::DomPage::new() else {
        tracing::error!("No window or document available");
        return;
    };

    let mut config = Config::default();
    page.apply_frame_config(&mut config);

    let page = Rc::new(page);
    let ctx = Rc::new(AppContext::new(
        config,
        page.as_ref(),
        Rc::new(fetch::GlooTransport),
        Rc::new(SystemClock),
    ));

    events::bind(&ctx, &page);

    if page.is_dashboard() {
        spawn_local(async move {
            ctx.start().await;
        });
    } else {
        ctx.nav().highlight(&page.location_path());
    }
}
