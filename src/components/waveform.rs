use leptos::ev;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};
use crate::canvas::waveform_renderer::{draw_playhead, draw_waveform};
use crate::engine::with_engine;
use crate::state::AppState;

/// Waveform strip under the spectrogram, following the same view.
#[component]
pub fn Waveform() -> impl IntoView {
    let state = expect_context::<AppState>();
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let layout_tick = RwSignal::new(0u32);

    let resize_handle = window_event_listener(ev::resize, move |_| {
        layout_tick.update(|n| *n = n.wrapping_add(1));
    });
    on_cleanup(move || resize_handle.remove());

    Effect::new(move || {
        let _ = layout_tick.get();
        let view = state.view.get();
        let playing = state.is_playing.get();
        let playhead = state.playhead_time.get();
        let region = state.active_region.get().and_then(|id| {
            state.regions.with(|rs| rs.iter().find(|r| r.id == id).map(|r| r.range()))
        });

        let Some(canvas_el) = canvas_ref.get() else { return };
        let canvas: &HtmlCanvasElement = canvas_el.as_ref();
        let rect = canvas.get_bounding_client_rect();
        let dpr = web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
        let (w, h) = (rect.width(), rect.height());
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let (dw, dh) = ((w * dpr).round() as u32, (h * dpr).round() as u32);
        if canvas.width() != dw || canvas.height() != dh {
            canvas.set_width(dw);
            canvas.set_height(dh);
        }
        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            return;
        };
        let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);

        let Some(view) = view else {
            ctx.set_fill_style_str("#0a0a0a");
            ctx.fill_rect(0.0, 0.0, w, h);
            return;
        };
        with_engine(|e| {
            if let Some(signal) = e.signal() {
                draw_waveform(&ctx, &signal.samples, signal.sample_rate, signal.start_time, view, w, h, region);
            }
        });
        if playing {
            draw_playhead(&ctx, playhead, view, w, h);
        }
    });

    view! {
        <div class="waveform-container">
            <canvas node_ref=canvas_ref />
        </div>
    }
}
