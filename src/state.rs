use leptos::prelude::*;
use sonoscope_core::coords::FreqScale;
use sonoscope_core::manager::RenderedFrame;
use sonoscope_core::types::{Region, RegionId, TimeRange};
use crate::settings::ViewPrefs;

/// Reactive mirror of the engine plus UI-only state. The engine itself
/// lives in `crate::engine`; these signals are refreshed by `engine::sync`.
#[derive(Clone, Copy)]
pub struct AppState {
    pub file_name: RwSignal<Option<String>>,
    pub loading: RwSignal<bool>,
    pub load_error: RwSignal<Option<String>>,
    /// Bumped on every load so background loops of an older file stop.
    pub load_id: RwSignal<u32>,

    pub data_span: RwSignal<Option<TimeRange>>,
    pub view: RwSignal<Option<TimeRange>>,
    /// Latest composed detail frame.
    pub frame: RwSignal<Option<RenderedFrame>>,
    /// Bumped whenever a pyramid tile lands (the overview redraws).
    pub tile_ready_signal: RwSignal<u32>,
    pub pyramid_progress: RwSignal<Option<(usize, usize)>>,

    pub scale: RwSignal<FreqScale>,
    pub playback_rate: RwSignal<f64>,

    pub regions: RwSignal<Vec<Region>>,
    pub active_region: RwSignal<Option<RegionId>>,
    pub editing: RwSignal<Option<usize>>,
    pub overlay_message: RwSignal<Option<String>>,
    /// Feature drawing locked by the toolbar switch.
    pub drawing_locked: RwSignal<bool>,

    pub is_playing: RwSignal<bool>,
    pub playhead_time: RwSignal<f64>,
    /// Position indicators hold still while a crossfade runs.
    pub indicator_paused: RwSignal<bool>,
    pub hires_generation: RwSignal<Option<u64>>,
}

impl AppState {
    pub fn new(prefs: &ViewPrefs) -> Self {
        Self {
            file_name: RwSignal::new(None),
            loading: RwSignal::new(false),
            load_error: RwSignal::new(None),
            load_id: RwSignal::new(0),
            data_span: RwSignal::new(None),
            view: RwSignal::new(None),
            frame: RwSignal::new(None),
            tile_ready_signal: RwSignal::new(0),
            pyramid_progress: RwSignal::new(None),
            scale: RwSignal::new(prefs.scale),
            playback_rate: RwSignal::new(prefs.playback_rate),
            regions: RwSignal::new(Vec::new()),
            active_region: RwSignal::new(None),
            editing: RwSignal::new(None),
            overlay_message: RwSignal::new(None),
            drawing_locked: RwSignal::new(false),
            is_playing: RwSignal::new(false),
            playhead_time: RwSignal::new(0.0),
            indicator_paused: RwSignal::new(false),
            hires_generation: RwSignal::new(None),
        }
    }

    pub fn has_data(&self) -> bool {
        self.data_span.get().is_some()
    }

    pub fn prefs(&self) -> ViewPrefs {
        ViewPrefs {
            scale: self.scale.get_untracked(),
            playback_rate: self.playback_rate.get_untracked(),
        }
    }
}
