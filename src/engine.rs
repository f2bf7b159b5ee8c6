//! Browser driver for the `ViewportManager`.
//!
//! The manager lives in a thread-local (it holds trait objects and is only
//! ever touched from the main thread). Everything that pokes it goes through
//! [`command`] or [`dispatch`], which afterwards mirror the engine into
//! [`AppState`] and (re)arm the one display-frame request and the one
//! timeout the engine asked for.

use std::cell::RefCell;
use leptos::prelude::*;
use sonoscope_core::config::EngineConfig;
use sonoscope_core::gesture::{InputEvent, SurfaceKind};
use sonoscope_core::hires::HiResJob;
use sonoscope_core::manager::{EngineEvent, ViewportManager};
use sonoscope_core::store::{MemoryRegionStore, StaticGate};
use sonoscope_core::surface::Completion;
use sonoscope_core::types::Signal;
use wasm_bindgen_futures::spawn_local;
use crate::audio::playback;
use crate::canvas::overlay_surface::with_overlay;
use crate::canvas::timers::{now_ms, yield_to_browser, FrameRequest, Timeout};
use crate::state::AppState;

const LOCKED_HINT: &str = "Feature drawing is locked. Unlock it in the toolbar to add boxes.";

thread_local! {
    static ENGINE: RefCell<Option<ViewportManager>> = RefCell::new(None);
    static FRAME: RefCell<Option<FrameRequest>> = RefCell::new(None);
    static TIMEOUT: RefCell<Option<Timeout>> = RefCell::new(None);
}

pub fn init(config: EngineConfig) {
    ENGINE.with(|e| *e.borrow_mut() = Some(ViewportManager::new(config)));
}

/// Borrow the engine. `None` before [`init`].
pub fn with_engine<R>(f: impl FnOnce(&mut ViewportManager) -> R) -> Option<R> {
    ENGINE.with(|e| e.borrow_mut().as_mut().map(f))
}

/// Run a command against the engine with the current time, then publish
/// the result and schedule whatever it asked for.
pub fn command<R>(state: AppState, f: impl FnOnce(&mut ViewportManager, f64) -> R) -> Option<R> {
    let now = now_ms();
    let result = with_engine(|e| f(e, now));
    sync(state);
    pump(state);
    result
}

/// Hand one input event to the engine.
pub fn dispatch(state: AppState, event: InputEvent, kind: SurfaceKind) {
    let now = now_ms();
    let response = with_engine(|e| with_overlay(|overlay| e.handle_input(&event, kind, overlay, now)));
    if let Some(response) = response {
        if let Some(release) = &response.release {
            log::debug!("Drag finished: {release:?}");
        }
    }
    sync(state);
    pump(state);
}

// ── Loading ─────────────────────────────────────────────────────────────────

pub fn load(state: AppState, name: String, signal: Signal) {
    playback::stop(state);
    let store = MemoryRegionStore::new(signal.span(), signal.sample_rate);
    let loaded = with_engine(|e| e.load_signal(signal, Box::new(store)));
    match loaded {
        Some(Ok(())) => {
            state.file_name.set(Some(name));
            state.load_error.set(None);
        }
        Some(Err(e)) => {
            log::error!("Could not load {name}: {e}");
            state.load_error.set(Some(format!("{name}: {e}")));
            return;
        }
        None => return,
    }
    // Apply remembered view settings to the fresh recording.
    let (scale, rate) = (state.scale.get_untracked(), state.playback_rate.get_untracked());
    let now = now_ms();
    with_engine(|e| {
        e.set_playback_rate(rate, now);
        if e.scale() != scale {
            e.set_scale(scale, now);
        }
    });
    apply_gate(state);

    state.load_id.update(|n| *n = n.wrapping_add(1));
    state.pyramid_progress.set(None);
    state.hires_generation.set(None);
    build_pyramid(state, state.load_id.get_untracked());
    sync(state);
    pump(state);
}

/// Push the toolbar's drawing lock into the engine's region gate.
pub fn apply_gate(state: AppState) {
    let permitted = !state.drawing_locked.get_untracked();
    with_engine(|e| e.set_gate(Box::new(StaticGate { permitted, hint: LOCKED_HINT.to_string() })));
}

/// Build the tile pyramid one tile per browser turn.
fn build_pyramid(state: AppState, load_id: u32) {
    spawn_local(async move {
        loop {
            yield_to_browser().await;
            if state.load_id.try_get_untracked() != Some(load_id) {
                return;
            }
            let Some(progress) = with_engine(|e| e.step_pyramid()).flatten() else { break };
            state.pyramid_progress.set(Some((progress.done, progress.total)));
            state.tile_ready_signal.update(|n| *n = n.wrapping_add(1));
            pump(state);
            if progress.is_complete() {
                break;
            }
        }
    });
}

// ── Frame and timer plumbing ────────────────────────────────────────────────

/// Make sure a display frame is requested if the engine wants one, and that
/// the timeout matches the engine's earliest deadline.
pub fn pump(state: AppState) {
    let Some((frame_pending, deadline)) = with_engine(|e| (e.frame_pending(), e.next_deadline())) else {
        return;
    };
    if frame_pending {
        FRAME.with(|f| {
            let mut f = f.borrow_mut();
            if f.is_none() {
                *f = FrameRequest::schedule(move |_| on_frame(state));
            }
        });
    }
    TIMEOUT.with(|t| {
        let mut t = t.borrow_mut();
        if t.as_ref().map(|t| t.deadline()) == deadline {
            return;
        }
        if let Some(old) = t.take() {
            old.cancel();
        }
        if let Some(deadline) = deadline {
            *t = Timeout::schedule(deadline, move || on_timeout(state));
        }
    });
}

fn on_frame(state: AppState) {
    FRAME.with(|f| f.borrow_mut().take());
    let now = now_ms();
    if state.is_playing.get_untracked() {
        // Keep frames coming while the playhead moves.
        with_engine(|e| e.request_redraw());
    }
    if let Some(frame) = with_engine(|e| e.render_frame(now)).flatten() {
        state.frame.set(Some(frame));
    }
    sync(state);
    pump(state);
}

fn on_timeout(state: AppState) {
    TIMEOUT.with(|t| t.borrow_mut().take());
    let now = now_ms();
    if let Some(job) = with_engine(|e| e.poll_timers(now)).flatten() {
        run_hires(state, job);
    }
    sync(state);
    pump(state);
}

/// Run a hi-res transform in chunks, yielding between them and giving up as
/// soon as a newer request supersedes it.
fn run_hires(state: AppState, mut job: HiResJob) {
    let chunk = with_engine(|e| e.config().hires.chunk_columns).unwrap_or(128);
    let generation = job.generation();
    spawn_local(async move {
        while !job.is_done() {
            yield_to_browser().await;
            if !with_engine(|e| e.is_current(generation)).unwrap_or(false) {
                log::debug!("Hi-res render {generation} superseded; stopping");
                return;
            }
            job.step(chunk);
        }
        let now = now_ms();
        match with_engine(|e| e.complete_hires(job.into_surface(), now)) {
            Some(Completion::Discarded { generation, latest }) => {
                log::debug!("Discarded stale render {generation} (latest {latest})");
            }
            Some(_) => state.hires_generation.set(Some(generation)),
            None => {}
        }
        sync(state);
        pump(state);
    });
}

/// Page teardown: stop playback, drop pending callbacks and stale renders.
pub fn teardown(state: AppState) {
    playback::stop(state);
    state.load_id.try_update(|n| *n = n.wrapping_add(1));
    with_engine(|e| e.cancel_pending_renders());
    FRAME.with(|f| {
        if let Some(frame) = f.borrow_mut().take() {
            frame.cancel();
        }
    });
    TIMEOUT.with(|t| {
        if let Some(timeout) = t.borrow_mut().take() {
            timeout.cancel();
        }
    });
    with_overlay(|o| o.detach());
}

// ── Mirroring into signals ──────────────────────────────────────────────────

fn set_if_changed<T: PartialEq + Send + Sync + 'static>(signal: RwSignal<T>, value: T) {
    if signal.with_untracked(|v| *v != value) {
        signal.set(value);
    }
}

/// Copy the engine's observable state into `AppState` and react to its
/// notifications.
pub fn sync(state: AppState) {
    let Some(snapshot) = with_engine(|e| {
        let viewport = e.viewport();
        (
            viewport.map(|v| v.view()),
            viewport.map(|v| v.data()),
            viewport.and_then(|v| v.active_region()),
            e.regions().to_vec(),
            e.editing(),
            e.overlay_message().map(str::to_string),
            e.scale(),
            e.take_events(),
        )
    }) else {
        return;
    };
    let (view, data, active, regions, editing, message, scale, events) = snapshot;

    for event in events {
        match event {
            EngineEvent::RenderApplied { generation } => log::debug!("Render {generation} applied"),
            EngineEvent::CrossfadeStarted => state.indicator_paused.set(true),
            EngineEvent::CrossfadeFinished => state.indicator_paused.set(false),
        }
    }

    set_if_changed(state.view, view);
    set_if_changed(state.data_span, data);
    set_if_changed(state.active_region, active);
    set_if_changed(state.regions, regions);
    set_if_changed(state.editing, editing);
    set_if_changed(state.overlay_message, message);
    set_if_changed(state.scale, scale);

    if state.is_playing.get_untracked() && !state.indicator_paused.get_untracked() {
        if let Some(t) = playback::position() {
            state.playhead_time.set(t);
        }
        if !playback::is_running() {
            state.is_playing.set(false);
        }
    }
}
