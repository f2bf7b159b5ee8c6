//! The transparent annotation canvas stacked over the spectrogram.
//!
//! It is created imperatively inside its container so it can be thrown away
//! and rebuilt when the 2D context goes missing (the element being detached
//! by a re-render, a zero-sized layout).

use std::cell::RefCell;
use sonoscope_core::coords::SurfaceSize;
use sonoscope_core::error::ResourceError;
use sonoscope_core::resource::DrawingResource;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement};

#[derive(Default)]
pub struct OverlaySurface {
    container: Option<HtmlElement>,
    canvas: Option<HtmlCanvasElement>,
    ctx: Option<CanvasRenderingContext2d>,
    size: Option<SurfaceSize>,
}

thread_local! {
    static OVERLAY: RefCell<OverlaySurface> = RefCell::new(OverlaySurface::default());
}

pub fn with_overlay<R>(f: impl FnOnce(&mut OverlaySurface) -> R) -> R {
    OVERLAY.with(|o| f(&mut o.borrow_mut()))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()?
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
}

impl OverlaySurface {
    /// Attach to `container` and build the canvas.
    pub fn attach(&mut self, container: HtmlElement) -> Result<(), ResourceError> {
        self.container = Some(container);
        self.recreate()
    }

    /// Drop the canvas; the next interaction will try to rebuild it.
    pub fn detach(&mut self) {
        if let Some(canvas) = self.canvas.take() {
            canvas.remove();
        }
        self.ctx = None;
        self.container = None;
    }

    /// Match the backing store to the surface's device size.
    pub fn resize(&mut self, size: SurfaceSize) {
        self.size = Some(size);
        if let Some(canvas) = &self.canvas {
            if canvas.width() != size.device_width() {
                canvas.set_width(size.device_width());
            }
            if canvas.height() != size.device_height() {
                canvas.set_height(size.device_height());
            }
        }
    }

    /// The context, scaled so callers draw in logical pixels.
    pub fn context(&self) -> Option<&CanvasRenderingContext2d> {
        let ctx = self.ctx.as_ref()?;
        let dpr = self.size.map(|s| s.device_pixel_ratio).unwrap_or(1.0);
        let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
        Some(ctx)
    }

    pub fn logical_size(&self) -> Option<(f64, f64)> {
        self.size.map(|s| (s.width, s.height))
    }
}

impl DrawingResource for OverlaySurface {
    fn is_valid(&self) -> bool {
        match (&self.canvas, &self.ctx) {
            (Some(canvas), Some(_)) => canvas.is_connected() && canvas.width() > 0 && canvas.height() > 0,
            _ => false,
        }
    }

    fn recreate(&mut self) -> Result<(), ResourceError> {
        let container = self.container.as_ref().ok_or(ResourceError::Detached)?;
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ResourceError::RecreateFailed("no document".into()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(|e| ResourceError::RecreateFailed(format!("{e:?}")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ResourceError::RecreateFailed("not a canvas".into()))?;
        canvas.set_class_name("overlay-canvas");

        if let Some(old) = self.canvas.take() {
            old.remove();
        }
        container
            .append_child(&canvas)
            .map_err(|e| ResourceError::RecreateFailed(format!("{e:?}")))?;

        let size = self.size.unwrap_or_else(|| {
            let rect = container.get_bounding_client_rect();
            let dpr = web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
            SurfaceSize::new(rect.width(), rect.height(), dpr)
        });
        canvas.set_width(size.device_width().max(1));
        canvas.set_height(size.device_height().max(1));

        self.ctx = Some(context_2d(&canvas).ok_or(ResourceError::ContextUnavailable)?);
        self.canvas = Some(canvas);
        self.size = Some(size);
        Ok(())
    }
}
