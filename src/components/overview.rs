use leptos::prelude::*;
use sonoscope_core::coords::{time_to_pixel, SurfaceSize};
use sonoscope_core::gesture::{InputEvent, PointerPhase, SurfaceKind};
use sonoscope_core::types::TimeRange;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent, WheelEvent};
use crate::canvas::resize_watch::ResizeWatch;
use crate::canvas::spectrogram_renderer::blit_raster;
use crate::components::spectrogram::wheel_deltas;
use crate::engine::{self, with_engine};
use crate::state::AppState;

fn get_canvas_ctx(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()?
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
}

/// Shade everything outside the detail view and outline the view itself.
fn draw_viewport_highlight(ctx: &CanvasRenderingContext2d, data: TimeRange, view: TimeRange, w: f64, h: f64) {
    let x0 = time_to_pixel(view.start, data, w).clamp(0.0, w);
    let x1 = time_to_pixel(view.end, data, w).clamp(0.0, w);
    let vw = (x1 - x0).max(2.0);

    ctx.set_fill_style_str("rgba(0,0,0,0.45)");
    ctx.fill_rect(0.0, 0.0, x0, h);
    ctx.fill_rect(x0 + vw, 0.0, (w - x0 - vw).max(0.0), h);

    ctx.set_stroke_style_str("rgba(255,255,255,0.8)");
    ctx.set_line_width(1.0);
    ctx.stroke_rect(x0 + 0.5, 0.5, vw - 1.0, h - 1.0);
}

/// Region spans as coloured bars along the top edge; the active one
/// brighter.
fn draw_region_markers(
    ctx: &CanvasRenderingContext2d,
    data: TimeRange,
    regions: &[(TimeRange, bool)],
    w: f64,
) {
    for (range, active) in regions {
        let x0 = time_to_pixel(range.start, data, w);
        let x1 = time_to_pixel(range.end, data, w);
        ctx.set_fill_style_str(if *active { "rgba(80,170,255,0.95)" } else { "rgba(80,170,255,0.5)" });
        ctx.fill_rect(x0, 0.0, (x1 - x0).max(2.0), 4.0);
    }
}

fn draw_playhead(ctx: &CanvasRenderingContext2d, data: TimeRange, t: f64, w: f64, h: f64) {
    let x = time_to_pixel(t, data, w).round() + 0.5;
    ctx.set_stroke_style_str("rgba(255, 80, 80, 0.9)");
    ctx.set_line_width(1.0);
    ctx.begin_path();
    ctx.move_to(x, 0.0);
    ctx.line_to(x, h);
    ctx.stroke();
}

/// Whole-recording strip. Shows the pyramid as tiles land, the detail view
/// as a highlighted window, and accepts click / drag to move that window.
#[component]
pub fn Overview() -> impl IntoView {
    let state = expect_context::<AppState>();
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let layout_tick = RwSignal::new(0u32);
    let pressed = StoredValue::new(false);

    let resize_watch = StoredValue::new_local(None::<ResizeWatch>);

    Effect::new(move || {
        let Some(canvas) = canvas_ref.get() else { return };
        let watch = ResizeWatch::observe(&canvas, move || {
            layout_tick.try_update(|n| *n = n.wrapping_add(1));
        });
        match watch {
            Ok(watch) => resize_watch.set_value(Some(watch)),
            Err(e) => log::warn!("ResizeObserver unavailable: {e:?}"),
        }
    });
    on_cleanup(move || {
        let _ = resize_watch.try_update_value(Option::take);
    });

    // Keep the engine's idea of the overview size current.
    Effect::new(move || {
        let _ = layout_tick.get();
        let _ = state.data_span.get();
        let Some(canvas) = canvas_ref.get() else { return };
        let rect = canvas.get_bounding_client_rect();
        let dpr = web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
        let size = SurfaceSize::new(rect.width(), rect.height(), dpr);
        if size.is_empty() {
            return;
        }
        if canvas.width() != size.device_width() || canvas.height() != size.device_height() {
            canvas.set_width(size.device_width());
            canvas.set_height(size.device_height());
        }
        if engine::command(state, |e, now| e.resize(SurfaceKind::Overview, size, now)) == Some(true) {
            state.tile_ready_signal.update(|n| *n = n.wrapping_add(1));
        }
    });

    Effect::new(move || {
        let _ = state.tile_ready_signal.get();
        let _ = state.scale.get();
        let view = state.view.get();
        let data = state.data_span.get();
        let playing = state.is_playing.get();
        let playhead = state.playhead_time.get();
        let active = state.active_region.get();
        let regions: Vec<(TimeRange, bool)> =
            state.regions.with(|rs| rs.iter().map(|r| (r.range(), Some(r.id) == active)).collect());

        let Some(canvas) = canvas_ref.get_untracked() else { return };
        let Some(ctx) = get_canvas_ctx(&canvas) else { return };
        let (Some(view), Some(data)) = (view, data) else {
            let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
            ctx.set_fill_style_str("#000");
            ctx.fill_rect(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);
            return;
        };

        let Some((raster, size)) = with_engine(|e| e.render_overview().map(|r| (r, e.overview_size()))).flatten()
        else {
            return;
        };
        blit_raster(&ctx, &canvas, &raster);
        let dpr = size.device_pixel_ratio;
        let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
        draw_region_markers(&ctx, data, &regions, size.width);
        draw_viewport_highlight(&ctx, data, view, size.width, size.height);
        if playing {
            draw_playhead(&ctx, data, playhead, size.width, size.height);
        }
    });

    let pointer = move |ev: &PointerEvent, phase: PointerPhase| {
        let Some(canvas) = canvas_ref.get_untracked() else { return };
        let rect = canvas.get_bounding_client_rect();
        let x = ev.client_x() as f64 - rect.left();
        let y = ev.client_y() as f64 - rect.top();
        engine::dispatch(state, InputEvent::Pointer { phase, x, y }, SurfaceKind::Overview);
    };

    let on_pointerdown = move |ev: PointerEvent| {
        if ev.button() != 0 {
            return;
        }
        pressed.set_value(true);
        if let Some(canvas) = canvas_ref.get_untracked() {
            let _ = canvas.set_pointer_capture(ev.pointer_id());
        }
        pointer(&ev, PointerPhase::Down);
    };
    let on_pointermove = move |ev: PointerEvent| {
        if pressed.get_value() {
            pointer(&ev, PointerPhase::Move);
        }
    };
    let on_pointerup = move |ev: PointerEvent| {
        pressed.set_value(false);
        if let Some(canvas) = canvas_ref.get_untracked() {
            let _ = canvas.release_pointer_capture(ev.pointer_id());
        }
        pointer(&ev, PointerPhase::Up);
    };
    let on_wheel = move |ev: WheelEvent| {
        ev.prevent_default();
        let Some(canvas) = canvas_ref.get_untracked() else { return };
        let rect = canvas.get_bounding_client_rect();
        let (delta_x, delta_y) = wheel_deltas(&ev);
        let cursor_x = ev.client_x() as f64 - rect.left();
        engine::dispatch(
            state,
            InputEvent::Wheel { delta_x, delta_y, cursor_x, ctrl: ev.ctrl_key() },
            SurfaceKind::Overview,
        );
    };

    view! {
        <div class="overview-strip">
            <canvas
                node_ref=canvas_ref
                on:pointerdown=on_pointerdown
                on:pointermove=on_pointermove
                on:pointerup=on_pointerup
                on:pointercancel=move |_| pressed.set_value(false)
                on:wheel=on_wheel
            />
            {move || state.pyramid_progress.get()
                .filter(|(done, total)| done < total)
                .map(|(done, total)| view! {
                    <span class="overview-progress">{format!("Building overview {done}/{total}")}</span>
                })}
        </div>
    }
}
