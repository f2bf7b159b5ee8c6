//! One-shot browser callbacks with explicit cancel: a display-frame request
//! over `requestAnimationFrame` and a timeout over `setTimeout`.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Milliseconds on the page's monotonic clock.
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// A pending `requestAnimationFrame` callback.
pub struct FrameRequest {
    id: i32,
}

impl FrameRequest {
    pub fn schedule(callback: impl FnOnce(f64) + 'static) -> Option<Self> {
        let cb = Closure::once_into_js(callback);
        let id = web_sys::window()?.request_animation_frame(cb.unchecked_ref()).ok()?;
        Some(Self { id })
    }

    pub fn cancel(self) {
        if let Some(w) = web_sys::window() {
            let _ = w.cancel_animation_frame(self.id);
        }
    }
}

/// A pending `setTimeout` callback aimed at an absolute deadline.
pub struct Timeout {
    id: i32,
    deadline: f64,
}

impl Timeout {
    pub fn schedule(deadline_ms: f64, callback: impl FnOnce() + 'static) -> Option<Self> {
        // Rounded up so the callback never runs before the deadline.
        let delay = (deadline_ms - now_ms()).ceil().max(0.0) as i32 + 1;
        let cb = Closure::once_into_js(callback);
        let id = web_sys::window()?
            .set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), delay)
            .ok()?;
        Some(Self { id, deadline: deadline_ms })
    }

    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    pub fn cancel(self) {
        if let Some(w) = web_sys::window() {
            w.clear_timeout_with_handle(self.id);
        }
    }
}

/// Let the browser paint and handle input before the next chunk of work.
pub async fn yield_to_browser() {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let Some(win) = web_sys::window() else { return };
        let cb = Closure::once_into_js(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), 0);
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
