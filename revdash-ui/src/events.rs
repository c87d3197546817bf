//! DOM event wiring
//!
//! Connects browser events to the application context. Listeners live for
//! the lifetime of the page, so their closures are leaked with `forget`.

use std::rc::Rc;

use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CustomEvent, Event, EventTarget, HtmlFormElement, PageTransitionEvent};

use revdash::AppContext;

use crate::dom::DomPage;

fn listen(target: &EventTarget, name: &str, handler: impl FnMut(Event) + 'static) {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    if let Err(e) =
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
    {
        tracing::error!("Failed to listen for {}: {:?}", name, e);
    }
    closure.forget();
}

fn spawn_refresh(ctx: &Rc<AppContext>) {
    let ctx = Rc::clone(ctx);
    spawn_local(async move {
        ctx.refresh().refresh().await;
    });
}

/// Register every page listener
pub fn bind(ctx: &Rc<AppContext>, page: &Rc<DomPage>) {
    bind_dom_ready(ctx, page);
    bind_refresh(ctx, page);
    bind_navigation(ctx, page);
    bind_session(ctx, page);
    bind_registration(ctx, page);
    schedule_enhancer(ctx, page);
}

fn bind_dom_ready(ctx: &Rc<AppContext>, page: &DomPage) {
    if page.document().ready_state() != "loading" {
        ctx.dom_ready();
        return;
    }

    let ctx = Rc::clone(ctx);
    listen(page.document(), "DOMContentLoaded", move |_| ctx.dom_ready());
}

fn bind_refresh(ctx: &Rc<AppContext>, page: &DomPage) {
    if let Some(button) = page.refresh_button() {
        let ctx = Rc::clone(ctx);
        listen(&button, "click", move |_| spawn_refresh(&ctx));
    }

    if !page.is_dashboard() {
        return;
    }

    let document = page.document().clone();
    let visible_ctx = Rc::clone(ctx);
    listen(page.document(), "visibilitychange", move |_| {
        if visible_ctx.refresh().should_refresh_on_visible(document.hidden()) {
            spawn_refresh(&visible_ctx);
        }
    });

    let secs = ctx.config().dashboard.auto_refresh_secs;
    if secs > 0 {
        let millis = u32::try_from(secs.saturating_mul(1000)).unwrap_or(u32::MAX);
        let ctx = Rc::clone(ctx);
        gloo_timers::callback::Interval::new(millis, move || spawn_refresh(&ctx)).forget();
        tracing::debug!(secs, "Auto refresh scheduled");
    }
}

fn bind_navigation(ctx: &Rc<AppContext>, page: &DomPage) {
    for (index, anchor) in page.nav_anchors().into_iter().enumerate() {
        let ctx = Rc::clone(ctx);
        listen(&anchor, "click", move |_| ctx.nav().select(index));
    }
}

fn bind_session(ctx: &Rc<AppContext>, page: &DomPage) {
    if let (Some(form), Some(_)) = (page.logout_form(), ctx.logout()) {
        let ctx = Rc::clone(ctx);
        listen(&form, "submit", move |event| {
            // Later submissions fall through to the native form action
            if !ctx.logout().is_some_and(|handler| handler.is_armed()) {
                return;
            }
            event.prevent_default();

            let ctx = Rc::clone(&ctx);
            spawn_local(async move {
                if let Some(handler) = ctx.logout() {
                    handler.submit().await;
                }
            });
        });
    }

    if ctx.history().is_none() {
        return;
    }

    let ctx = Rc::clone(ctx);
    listen(page.window(), "pageshow", move |event| {
        let persisted = event
            .dyn_ref::<PageTransitionEvent>()
            .is_some_and(|e| e.persisted());
        if let Some(guard) = ctx.history() {
            guard.on_page_show(persisted);
        }
    });
}

fn bind_registration(ctx: &Rc<AppContext>, page: &DomPage) {
    let ctx = Rc::clone(ctx);
    listen(page.document(), "htmx:afterRequest", move |event| {
        let Some(form) = event
            .target()
            .and_then(|target| target.dyn_into::<HtmlFormElement>().ok())
        else {
            return;
        };

        let detail = event
            .dyn_ref::<CustomEvent>()
            .map(|e| e.detail())
            .unwrap_or(JsValue::UNDEFINED);
        let successful = Reflect::get(&detail, &"successful".into())
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let body = Reflect::get(&detail, &"xhr".into())
            .ok()
            .filter(|xhr| xhr.is_object())
            .and_then(|xhr| Reflect::get(&xhr, &"response".into()).ok())
            .and_then(|response| response.as_string());

        ctx.registration()
            .on_request_complete(&form.id(), successful, body.as_deref());
    });
}

/// Load the enhancement library once the page is idle, or after `load`
fn schedule_enhancer(ctx: &Rc<AppContext>, page: &Rc<DomPage>) {
    if !ctx.enhancer().is_enabled() {
        return;
    }

    let ensure = {
        let ctx = Rc::clone(ctx);
        let page = Rc::clone(page);
        move || {
            ctx.enhancer().ensure(page.as_ref());
        }
    };

    let window = page.window();
    let idle = Reflect::get(window, &"requestIdleCallback".into())
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok());

    match idle {
        Some(request_idle) => {
            let callback = Closure::once_into_js(ensure);
            if let Err(e) = request_idle.call1(window, &callback) {
                tracing::error!("requestIdleCallback failed: {:?}", e);
            }
        }
        None => {
            listen(window, "load", move |_| ensure());
        }
    }
}
