use leptos::ev;
use leptos::prelude::*;
use sonoscope_core::coords::SurfaceSize;
use sonoscope_core::gesture::{InputEvent, PointerPhase, SurfaceKind};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, PointerEvent, TouchEvent, WheelEvent};
use crate::audio::playback;
use crate::canvas::overlay_renderer::{box_types, draw_overlay};
use crate::canvas::overlay_surface::with_overlay;
use crate::canvas::resize_watch::ResizeWatch;
use crate::canvas::spectrogram_renderer::{blit_raster, draw_badge, draw_freq_axis};
use crate::canvas::time_markers::draw_time_markers;
use crate::components::pinch::{two_finger_geometry, PinchTracker};
use crate::engine;
use crate::state::AppState;

fn get_canvas_ctx(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()?
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
}

fn device_pixel_ratio() -> f64 {
    web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0)
}

/// Wheel deltas in pixels whatever the browser's delta mode.
pub fn wheel_deltas(ev: &WheelEvent) -> (f64, f64) {
    let unit = match ev.delta_mode() {
        WheelEvent::DOM_DELTA_LINE => 16.0,
        WheelEvent::DOM_DELTA_PAGE => 400.0,
        _ => 1.0,
    };
    (ev.delta_x() * unit, ev.delta_y() * unit)
}

/// Keys typed into form fields stay with the field.
pub fn is_typing_target(ev: &web_sys::KeyboardEvent) -> bool {
    ev.target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .map(|el| matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT"))
        .unwrap_or(false)
}

/// Match the main canvas, the overlay and the engine to the container's
/// current layout size.
fn sync_size(state: AppState, container: &HtmlElement, canvas: &HtmlCanvasElement) {
    let rect = container.get_bounding_client_rect();
    let size = SurfaceSize::new(rect.width(), rect.height(), device_pixel_ratio());
    if size.is_empty() {
        return;
    }
    if canvas.width() != size.device_width() {
        canvas.set_width(size.device_width());
    }
    if canvas.height() != size.device_height() {
        canvas.set_height(size.device_height());
    }
    with_overlay(|o| o.resize(size));
    engine::command(state, |e, now| e.resize(SurfaceKind::Detail, size, now));
}

#[component]
pub fn Spectrogram() -> impl IntoView {
    let state = expect_context::<AppState>();
    let container_ref = NodeRef::<leptos::html::Div>::new();
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let pinch = StoredValue::new(PinchTracker::default());
    let resize_watch = StoredValue::new_local(None::<ResizeWatch>);

    // Attach the overlay, take the first measurement once mounted and
    // re-measure whenever the container's layout box changes.
    Effect::new(move || {
        let (Some(container), Some(canvas)) = (container_ref.get(), canvas_ref.get()) else { return };
        let container: HtmlElement = container.into();
        sync_size(state, &container, &canvas);
        if let Err(e) = with_overlay(|o| o.attach(container.clone())) {
            log::warn!("Overlay canvas unavailable: {e}");
        }
        let observed = container.clone();
        let watch = ResizeWatch::observe(&container, move || {
            if let Some(canvas) = canvas_ref.get_untracked() {
                sync_size(state, &observed, &canvas);
            }
        });
        match watch {
            Ok(watch) => resize_watch.set_value(Some(watch)),
            Err(e) => log::warn!("ResizeObserver unavailable: {e:?}"),
        }
    });

    // New data can arrive after layout changed without a resize event.
    Effect::new(move || {
        let _ = state.data_span.get();
        let (Some(container), Some(canvas)) = (container_ref.get_untracked(), canvas_ref.get_untracked()) else {
            return;
        };
        sync_size(state, &container.into(), &canvas);
    });

    let key_handle = window_event_listener(ev::keydown, move |ev| {
        if is_typing_target(&ev) || state.data_span.get_untracked().is_none() {
            return;
        }
        if ev.key() == " " {
            ev.prevent_default();
            if state.is_playing.get_untracked() {
                playback::stop(state);
            } else {
                let from = state.view.get_untracked().map(|v| v.start).unwrap_or(0.0);
                playback::play(state, from);
            }
            return;
        }
        if ev.key().starts_with("Arrow") {
            ev.prevent_default();
        }
        engine::dispatch(state, InputEvent::Key { key: ev.key() }, SurfaceKind::Detail);
    });

    on_cleanup(move || {
        let _ = resize_watch.try_update_value(Option::take);
        key_handle.remove();
    });

    // Paint whatever frame the engine composed last.
    Effect::new(move || {
        let playing = state.is_playing.get();
        let playhead = state.playhead_time.get();
        state.frame.with(|frame| {
            let Some(frame) = frame else { return };
            let Some(canvas) = canvas_ref.get_untracked() else { return };
            let Some(ctx) = get_canvas_ctx(&canvas) else { return };

            blit_raster(&ctx, &canvas, &frame.raster);
            let size = frame.transform.size;
            let dpr = size.device_pixel_ratio;
            let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
            draw_freq_axis(&ctx, &frame.transform);
            let data_start = state.data_span.get_untracked().map(|d| d.start).unwrap_or(0.0);
            draw_time_markers(&ctx, frame.transform.view, data_start, size.width, size.height);
            if frame.from_hires {
                draw_badge(&ctx, "HQ", size.width);
            }

            let types = state.regions.with_untracked(|regions| {
                let active = state.active_region.get_untracked();
                box_types(&frame.boxes, regions.iter().find(|r| Some(r.id) == active))
            });
            let playhead_x = playing.then(|| frame.transform.x_of(playhead));
            with_overlay(|o| {
                let Some((w, h)) = o.logical_size() else { return };
                if let Some(octx) = o.context() {
                    draw_overlay(octx, &frame.boxes, &types, frame.drag_rect, playhead_x, w, h);
                }
            });
        });
    });

    let pointer = move |ev: &PointerEvent, phase: PointerPhase| {
        let Some(container) = container_ref.get_untracked() else { return };
        let rect = container.get_bounding_client_rect();
        let x = ev.client_x() as f64 - rect.left();
        let y = ev.client_y() as f64 - rect.top();
        engine::dispatch(state, InputEvent::Pointer { phase, x, y }, SurfaceKind::Detail);
    };
    let pinching = move || pinch.with_value(|p| p.is_active());

    let on_pointerdown = move |ev: PointerEvent| {
        if ev.button() != 0 || pinching() {
            return;
        }
        if let Some(container) = container_ref.get_untracked() {
            let _ = container.set_pointer_capture(ev.pointer_id());
        }
        pointer(&ev, PointerPhase::Down);
    };
    let on_pointermove = move |ev: PointerEvent| {
        if !pinching() {
            pointer(&ev, PointerPhase::Move);
        }
    };
    let on_pointerup = move |ev: PointerEvent| {
        if let Some(container) = container_ref.get_untracked() {
            let _ = container.release_pointer_capture(ev.pointer_id());
        }
        pointer(&ev, PointerPhase::Up);
    };
    let on_pointercancel = move |ev: PointerEvent| pointer(&ev, PointerPhase::Cancel);

    let on_wheel = move |ev: WheelEvent| {
        ev.prevent_default();
        let Some(container) = container_ref.get_untracked() else { return };
        let rect = container.get_bounding_client_rect();
        let (delta_x, delta_y) = wheel_deltas(&ev);
        let cursor_x = ev.client_x() as f64 - rect.left();
        engine::dispatch(
            state,
            InputEvent::Wheel { delta_x, delta_y, cursor_x, ctrl: ev.ctrl_key() },
            SurfaceKind::Detail,
        );
    };

    // Two-finger pinch zoom / pan. A second finger cancels any box drag the
    // first one started.
    let on_touchstart = move |ev: TouchEvent| {
        if let Some((mid_x, dist)) = two_finger_geometry(&ev.touches()) {
            ev.prevent_default();
            pinch.update_value(|p| p.begin(mid_x, dist));
            engine::dispatch(state, InputEvent::Key { key: "Escape".into() }, SurfaceKind::Detail);
        }
    };
    let on_touchmove = move |ev: TouchEvent| {
        let Some((mid_x, dist)) = two_finger_geometry(&ev.touches()) else { return };
        ev.prevent_default();
        let Some(container) = container_ref.get_untracked() else { return };
        let left = container.get_bounding_client_rect().left();
        let mut tracker = pinch.get_value();
        let event = tracker.step(mid_x, dist, left);
        pinch.set_value(tracker);
        if let Some(event) = event {
            engine::dispatch(state, event, SurfaceKind::Detail);
        }
    };
    let on_touchend = move |ev: TouchEvent| {
        if ev.touches().length() < 2 {
            pinch.update_value(|p| p.end());
        }
    };

    view! {
        <div
            class="spectrogram-container"
            node_ref=container_ref
            on:pointerdown=on_pointerdown
            on:pointermove=on_pointermove
            on:pointerup=on_pointerup
            on:pointercancel=on_pointercancel
            on:wheel=on_wheel
            on:touchstart=on_touchstart
            on:touchmove=on_touchmove
            on:touchend=on_touchend
        >
            <canvas class="spectrogram-canvas" node_ref=canvas_ref />
            {move || state.overlay_message.get().map(|msg| view! {
                <div class="overlay-message" on:pointerdown=|ev: PointerEvent| ev.stop_propagation()>
                    <span>{msg}</span>
                    <button on:click=move |_| {
                        engine::command(state, |e, _| e.clear_overlay_message());
                    }>"Dismiss"</button>
                </div>
            })}
        </div>
    }
}
