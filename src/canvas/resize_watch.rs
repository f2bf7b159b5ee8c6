use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, ResizeObserver};

/// Runs a callback whenever an element's layout box changes size, whether
/// the window resized or a neighbouring panel grew. Disconnects on drop.
pub struct ResizeWatch {
    observer: ResizeObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, ResizeObserver)>,
}

impl ResizeWatch {
    pub fn observe(el: &Element, mut on_resize: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let callback =
            Closure::<dyn FnMut(js_sys::Array, ResizeObserver)>::new(move |_entries: js_sys::Array, _: ResizeObserver| {
                on_resize()
            });
        let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
        observer.observe(el);
        Ok(Self { observer, _callback: callback })
    }
}

impl Drop for ResizeWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
