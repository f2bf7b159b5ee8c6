use std::cell::RefCell;
use leptos::prelude::*;
use web_sys::{AudioBufferSourceNode, AudioContext};
use crate::engine::with_engine;
use crate::state::AppState;

struct Playback {
    ctx: AudioContext,
    source: AudioBufferSourceNode,
    /// `ctx.current_time()` when `offset` was last rebased.
    started_at: f64,
    /// Recording time (seconds) at `started_at`.
    offset: f64,
    end: f64,
    rate: f64,
}

impl Playback {
    fn position(&self) -> f64 {
        (self.offset + (self.ctx.current_time() - self.started_at) * self.rate).min(self.end)
    }
}

thread_local! {
    static PLAYBACK: RefCell<Option<Playback>> = RefCell::new(None);
}

/// Play the recording from `from` (seconds) to its end at the current
/// playback rate.
pub fn play(state: AppState, from: f64) {
    stop(state);
    let Some(signal) = with_engine(|e| e.signal().cloned()).flatten() else { return };
    let rate = state.playback_rate.get_untracked();
    let sr = signal.sample_rate as f64;
    let first = ((from - signal.start_time) * sr).max(0.0) as usize;
    if first >= signal.samples.len() {
        return;
    }
    let slice = &signal.samples[first..];

    let ctx = match AudioContext::new() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to create AudioContext: {:?}", e);
            return;
        }
    };
    let buffer = match ctx.create_buffer(1, slice.len() as u32, signal.sample_rate as f32) {
        Ok(b) => b,
        Err(e) => {
            log::error!("Failed to create AudioBuffer at {} Hz: {:?}", signal.sample_rate, e);
            let _ = ctx.close();
            return;
        }
    };
    if let Err(e) = buffer.copy_to_channel(slice, 0) {
        log::error!("Failed to fill AudioBuffer: {:?}", e);
        let _ = ctx.close();
        return;
    }
    let source = match ctx.create_buffer_source() {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to create buffer source: {:?}", e);
            let _ = ctx.close();
            return;
        }
    };
    source.set_buffer(Some(&buffer));
    source.playback_rate().set_value(rate as f32);
    if let Err(e) = source.connect_with_audio_node(&ctx.destination()) {
        log::error!("Failed to connect source -> destination: {:?}", e);
        let _ = ctx.close();
        return;
    }
    if let Err(e) = source.start() {
        log::error!("Failed to start playback: {:?}", e);
        let _ = ctx.close();
        return;
    }

    let offset = signal.start_time + first as f64 / sr;
    PLAYBACK.with(|p| {
        *p.borrow_mut() = Some(Playback {
            started_at: ctx.current_time(),
            ctx,
            source,
            offset,
            end: signal.end_time(),
            rate,
        })
    });
    state.playhead_time.set(offset);
    state.is_playing.set(true);
    with_engine(|e| e.request_redraw());
    crate::engine::pump(state);
}

pub fn stop(state: AppState) {
    if let Some(p) = PLAYBACK.with(|p| p.borrow_mut().take()) {
        let _ = p.source.stop();
        let _ = p.ctx.close();
    }
    state.is_playing.try_set(false);
}

/// Change speed mid-play without a jump in position.
pub fn set_rate(rate: f64) {
    PLAYBACK.with(|p| {
        if let Some(p) = p.borrow_mut().as_mut() {
            p.offset = p.position();
            p.started_at = p.ctx.current_time();
            p.rate = rate;
            p.source.playback_rate().set_value(rate as f32);
        }
    });
}

pub fn position() -> Option<f64> {
    PLAYBACK.with(|p| p.borrow().as_ref().map(Playback::position))
}

pub fn is_running() -> bool {
    PLAYBACK.with(|p| p.borrow().as_ref().is_some_and(|p| p.position() < p.end))
}
