//! `ViewportManager` owns the viewport and everything that depends on it.
//!
//! It is the only writer of [`ViewportState`]; the front end feeds it input
//! events, display-frame callbacks and timer wake-ups, and draws whatever
//! [`ViewportManager::render_frame`] hands back. Time is always passed in as
//! `now_ms` so every state machine here runs off one injected clock.

use crate::annotation::{AnnotationOverlay, OverlayBox, PressOutcome, ReleaseOutcome};
use crate::config::EngineConfig;
use crate::coords::{CoordinateTransform, FreqAxis, FreqScale, PixelRect, SurfaceSize};
use crate::error::{RenderError, StoreError, ViewportError};
use crate::gesture::{apply_action, GestureAction, GestureInputHandler, InputEvent, PointerPhase, SurfaceKind};
use crate::hires::{HiResJob, HiResRequest, RenderSurface, SurfaceKey};
use crate::pyramid::{BuildProgress, PyramidBuilder, TilePyramid};
use crate::raster::Raster;
use crate::resource::DrawingResource;
use crate::scheduler::{plan_quality, QualityDecision, RenderScheduler};
use crate::store::{FeatureStore, MemoryRegionStore, RegionGate, StaticGate};
use crate::surface::{Completion, CrossfadeTick, SpectrogramSurface};
use crate::types::{FeatureType, Region, RegionId, Signal, TimeRange};
use crate::viewport::{PanOutcome, ViewportState};

/// Render-completion notifications for UI collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    RenderApplied { generation: u64 },
    /// A crossfade began; position indicators pause.
    CrossfadeStarted,
    /// The crossfade ended; paused indicators resume.
    CrossfadeFinished,
}

/// What the front end must do after handing over an input event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputResponse {
    pub request_frame: bool,
    pub view_changed: bool,
    pub press: Option<PressOutcome>,
    pub release: Option<ReleaseOutcome>,
}

/// Everything needed to paint the detail track for one display frame.
pub struct RenderedFrame {
    pub raster: Raster,
    pub transform: CoordinateTransform,
    pub boxes: Vec<OverlayBox>,
    pub drag_rect: Option<PixelRect>,
    pub from_hires: bool,
    pub crossfading: bool,
}

pub struct ViewportManager {
    config: EngineConfig,
    signal: Option<Signal>,
    viewport: Option<ViewportState>,
    gestures: GestureInputHandler,
    scheduler: RenderScheduler,
    surface: SpectrogramSurface,
    pyramid: Option<TilePyramid>,
    builder: Option<PyramidBuilder>,
    overlay: AnnotationOverlay,
    store: Box<dyn FeatureStore>,
    gate: Box<dyn RegionGate>,
    detail: SurfaceSize,
    overview: SurfaceSize,
    playback_rate: f64,
    indicator_paused: bool,
    events: Vec<EngineEvent>,
}

impl ViewportManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            gestures: GestureInputHandler::new(config.gesture.clone()),
            scheduler: RenderScheduler::new(&config.scheduler),
            surface: SpectrogramSurface::new(FreqScale::Linear, config.crossfade_ms),
            overlay: AnnotationOverlay::new(&config.overlay),
            store: Box::new(MemoryRegionStore::new(TimeRange::new(0.0, 0.0), 1)),
            gate: Box::new(StaticGate::default()),
            signal: None,
            viewport: None,
            pyramid: None,
            builder: None,
            detail: SurfaceSize::new(0.0, 0.0, 1.0),
            overview: SurfaceSize::new(0.0, 0.0, 1.0),
            playback_rate: 1.0,
            indicator_paused: false,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Data lifecycle ──────────────────────────────────────────────────────

    /// Replace the recording. The previous viewport, renders and pyramid are
    /// dropped; the pyramid is rebuilt through [`step_pyramid`](Self::step_pyramid).
    pub fn load_signal(&mut self, signal: Signal, store: Box<dyn FeatureStore>) -> Result<(), ViewportError> {
        let viewport = ViewportState::new(signal.span(), signal.sample_rate, &self.config.viewport)?;
        self.cancel_pending_renders();
        self.surface.reset();
        self.overlay.cancel();
        self.overlay.set_editing(None);

        let pyramid = TilePyramid::new(&signal, &self.config.pyramid);
        self.builder = Some(PyramidBuilder::new(
            signal.clone(),
            &pyramid,
            &self.config.pyramid,
            self.config.db_floor,
        ));
        log::info!(
            "Loaded {:.1}s at {} Hz; pyramid {} levels / {} base tiles",
            signal.duration_secs(),
            signal.sample_rate,
            pyramid.level_count(),
            pyramid.tile_count(0)
        );
        self.pyramid = Some(pyramid);
        self.viewport = Some(viewport);
        self.signal = Some(signal);
        self.store = store;
        self.scheduler.request_fast();
        Ok(())
    }

    pub fn signal(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    pub fn pyramid(&self) -> Option<&TilePyramid> {
        self.pyramid.as_ref()
    }

    /// Build one more pyramid tile. `None` once the pyramid is complete.
    pub fn step_pyramid(&mut self) -> Option<BuildProgress> {
        let (Some(builder), Some(pyramid)) = (self.builder.as_mut(), self.pyramid.as_mut()) else {
            return None;
        };
        let progress = builder.step(pyramid);
        if progress.is_complete() {
            self.builder = None;
        }
        self.scheduler.request_fast();
        Some(progress)
    }

    // ── Commands exposed to collaborators ───────────────────────────────────

    pub fn viewport(&self) -> Option<&ViewportState> {
        self.viewport.as_ref()
    }

    pub fn zoom_to_region(&mut self, id: RegionId, now_ms: f64) -> Result<(), ViewportError> {
        let region = self.store.region(id).cloned().ok_or(ViewportError::UnknownRegion(id))?;
        let viewport = self.viewport.as_mut().ok_or(ViewportError::NoData)?;
        viewport.enter_region(&region)?;
        self.overlay.set_editing(None);
        self.after_view_change(now_ms);
        Ok(())
    }

    /// Show the whole recording and leave region mode.
    pub fn zoom_to_full(&mut self, now_ms: f64) -> Result<(), ViewportError> {
        let viewport = self.viewport.as_mut().ok_or(ViewportError::NoData)?;
        viewport.exit_region();
        viewport.set_to_full();
        self.overlay.cancel();
        self.overlay.set_editing(None);
        self.after_view_change(now_ms);
        Ok(())
    }

    /// Teardown: drop the pending frame, the debounce and any crossfade, and
    /// make every in-flight render stale. Returns whether a display frame
    /// request was outstanding (the caller cancels it).
    pub fn cancel_pending_renders(&mut self) -> bool {
        let had_frame = self.scheduler.cancel_all();
        self.surface.cancel_pending();
        if self.indicator_paused {
            self.indicator_paused = false;
            self.events.push(EngineEvent::CrossfadeFinished);
        }
        had_frame
    }

    fn after_view_change(&mut self, now_ms: f64) {
        self.scheduler.request_fast();
        self.scheduler.note_input(now_ms);
    }

    // ── Input ───────────────────────────────────────────────────────────────

    fn size_of(&self, kind: SurfaceKind) -> SurfaceSize {
        match kind {
            SurfaceKind::Detail => self.detail,
            SurfaceKind::Overview => self.overview,
        }
    }

    pub fn handle_input(
        &mut self,
        event: &InputEvent,
        kind: SurfaceKind,
        overlay_surface: &mut dyn DrawingResource,
        now_ms: f64,
    ) -> InputResponse {
        let mut response = InputResponse::default();
        let Some(viewport) = self.viewport.as_ref() else { return response };
        let width = self.size_of(kind).width;
        let action = self.gestures.interpret(event, kind, viewport, width, now_ms);

        match action {
            GestureAction::Ignored => {}
            GestureAction::CancelDrag => {
                let cancelled = self.overlay.cancel();
                if self.overlay.editing().is_some() {
                    self.overlay.set_editing(None);
                    response.request_frame |= self.scheduler.request_fast();
                }
                if cancelled {
                    response.request_frame |= self.scheduler.request_fast();
                }
            }
            GestureAction::Pointer { phase, x, y } => match kind {
                SurfaceKind::Detail => self.detail_pointer(phase, x, y, overlay_surface, now_ms, &mut response),
                SurfaceKind::Overview => self.overview_pointer(phase, x, now_ms, &mut response),
            },
            GestureAction::ZoomToFull => {
                let already = self.viewport.as_ref().is_some_and(|v| v.is_full() && v.active_region().is_none());
                let pending = self.scheduler.is_fast_pending();
                match self.zoom_to_full(now_ms) {
                    Ok(()) => {
                        response.view_changed = !already;
                        response.request_frame = !pending && self.scheduler.is_fast_pending();
                    }
                    Err(e) => log::debug!("Zoom to full rejected: {e}"),
                }
            }
            GestureAction::Zoom { .. } | GestureAction::Pan { .. } | GestureAction::Pinch { .. } => {
                if let Some(viewport) = self.viewport.as_mut() {
                    match apply_action(action, viewport) {
                        Ok(changed) => response.view_changed = changed,
                        Err(e) => log::debug!("Gesture rejected: {e}"),
                    }
                }
                self.scheduler.note_input(now_ms);
                if response.view_changed {
                    response.request_frame = self.scheduler.request_fast();
                }
            }
        }
        response
    }

    fn detail_transform(&self, now_ms: f64) -> Option<CoordinateTransform> {
        let viewport = self.viewport.as_ref()?;
        Some(CoordinateTransform {
            view: viewport.view(),
            size: self.detail,
            axis: self.freq_axis()?,
            mapping: self.surface.mapping(now_ms),
        })
    }

    pub fn freq_axis(&self) -> Option<FreqAxis> {
        let signal = self.signal.as_ref()?;
        Some(FreqAxis::new(signal.nyquist(), self.config.pyramid.fft_size).with_playback_rate(self.playback_rate))
    }

    fn detail_pointer(
        &mut self,
        phase: PointerPhase,
        x: f64,
        y: f64,
        overlay_surface: &mut dyn DrawingResource,
        now_ms: f64,
        response: &mut InputResponse,
    ) {
        let Some(transform) = self.detail_transform(now_ms) else { return };
        let region_id = self.viewport.as_ref().and_then(|v| v.active_region());
        match phase {
            PointerPhase::Down => {
                let region = region_id.and_then(|id| self.store.region(id));
                let outcome = self.overlay.press(x, y, region, self.gate.as_ref(), overlay_surface, &transform, now_ms);
                response.press = Some(outcome);
            }
            PointerPhase::Move => {
                if self.overlay.drag_rect().is_none() {
                    return;
                }
                self.overlay.drag_to(x, y, now_ms);
            }
            PointerPhase::Up => {
                let Some(id) = region_id else {
                    self.overlay.cancel();
                    return;
                };
                let outcome = self.overlay.release(x, y, self.store.as_mut(), id, &transform);
                response.release = Some(outcome);
            }
            PointerPhase::Cancel => {
                self.overlay.cancel();
            }
        }
        response.request_frame = self.scheduler.request_fast();
    }

    /// Click or drag on the overview centres the view on the pointer.
    fn overview_pointer(&mut self, phase: PointerPhase, x: f64, now_ms: f64, response: &mut InputResponse) {
        if !matches!(phase, PointerPhase::Down | PointerPhase::Move) || !self.config.gesture.overview.pan_enabled {
            return;
        }
        let width = self.overview.width;
        let Some(viewport) = self.viewport.as_mut() else { return };
        if width <= 0.0 {
            return;
        }
        let data = viewport.data();
        let target = data.start + (x / width).clamp(0.0, 1.0) * data.width();
        match viewport.pan_by(target - viewport.view().center()) {
            Ok(outcome) => response.view_changed = outcome != PanOutcome::Unchanged,
            Err(e) => log::debug!("Overview pan rejected: {e}"),
        }
        self.scheduler.note_input(now_ms);
        if response.view_changed {
            response.request_frame = self.scheduler.request_fast();
        }
    }

    /// Ask for a fast redraw outside of input handling (e.g. playhead moves).
    pub fn request_redraw(&mut self) -> bool {
        self.scheduler.request_fast()
    }

    /// A display frame has been requested and not yet rendered.
    pub fn frame_pending(&self) -> bool {
        self.scheduler.is_fast_pending()
    }

    // ── Surfaces ────────────────────────────────────────────────────────────

    /// Record a surface's new size. A detail resize drops a hi-res surface
    /// whose pixel width no longer matches and schedules a fresh one.
    pub fn resize(&mut self, kind: SurfaceKind, size: SurfaceSize, now_ms: f64) -> bool {
        let previous = self.size_of(kind);
        if previous == size {
            return false;
        }
        match kind {
            SurfaceKind::Overview => self.overview = size,
            SurfaceKind::Detail => {
                self.detail = size;
                if previous.device_width() != size.device_width() || previous.device_height() != size.device_height() {
                    self.surface.invalidate();
                    self.scheduler.note_input(now_ms);
                }
            }
        }
        self.scheduler.request_fast()
    }

    pub fn detail_size(&self) -> SurfaceSize {
        self.detail
    }

    pub fn overview_size(&self) -> SurfaceSize {
        self.overview
    }

    pub fn scale(&self) -> FreqScale {
        self.surface.scale()
    }

    /// Change the frequency scale; the current image crossfades into the new
    /// layout and position indicators pause until it finishes.
    pub fn set_scale(&mut self, scale: FreqScale, now_ms: f64) -> bool {
        if self.surface.set_scale(scale, now_ms) {
            self.pause_indicator();
        }
        self.scheduler.note_input(now_ms);
        self.scheduler.request_fast()
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn set_playback_rate(&mut self, rate: f64, now_ms: f64) -> bool {
        if !(rate.is_finite() && rate > 0.0) || rate == self.playback_rate {
            return false;
        }
        self.playback_rate = rate;
        self.scheduler.note_input(now_ms);
        self.scheduler.request_fast()
    }

    fn pause_indicator(&mut self) {
        self.indicator_paused = true;
        self.events.push(EngineEvent::CrossfadeStarted);
    }

    pub fn indicator_paused(&self) -> bool {
        self.indicator_paused
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Frame and timer callbacks ───────────────────────────────────────────

    /// Display-frame callback. Composes the detail image from the fast path
    /// and rebuilds the overlay. `None` when nothing is loaded or the
    /// surface has no area.
    pub fn render_frame(&mut self, now_ms: f64) -> Option<RenderedFrame> {
        self.scheduler.begin_frame();
        match self.surface.tick(now_ms) {
            CrossfadeTick::Finished => {
                self.indicator_paused = false;
                self.events.push(EngineEvent::CrossfadeFinished);
            }
            CrossfadeTick::Running { .. } => {
                self.scheduler.request_fast();
            }
            CrossfadeTick::Idle => {}
        }

        let view = self.viewport.as_ref()?.view();
        if self.detail.is_empty() {
            return None;
        }
        let axis = self.freq_axis()?;
        let frame = self.surface.compose(view, self.detail, self.pyramid.as_ref(), &axis, now_ms);
        let transform = CoordinateTransform { view, size: self.detail, axis, mapping: frame.mapping };

        let region = self.viewport.as_ref().and_then(|v| v.active_region()).and_then(|id| self.store.region(id));
        self.overlay.rebuild(region, &transform);

        Some(RenderedFrame {
            raster: frame.raster,
            transform,
            boxes: self.overlay.boxes().to_vec(),
            drag_rect: self.overlay.drag_rect(),
            from_hires: frame.from_hires,
            crossfading: self.surface.is_crossfading(),
        })
    }

    /// Full-span pyramid crop for the overview strip.
    pub fn render_overview(&self) -> Option<Raster> {
        let pyramid = self.pyramid.as_ref()?;
        let axis = self.freq_axis()?;
        if self.overview.is_empty() {
            return None;
        }
        Some(pyramid.crop(
            pyramid.data(),
            self.overview.device_width(),
            self.overview.device_height(),
            &axis,
            self.surface.scale().into(),
        ))
    }

    /// Earliest pending timer deadline (gesture settle, quality debounce,
    /// drag safety).
    pub fn next_deadline(&self) -> Option<f64> {
        [
            self.scheduler.quality_deadline(),
            self.gestures.settle_deadline(),
            self.overlay.safety_deadline(),
        ]
        .into_iter()
        .flatten()
        .reduce(f64::min)
    }

    /// Timer callback. Returns a hi-res job when the quality debounce fired
    /// and a render is warranted; the caller runs it and hands the result to
    /// [`complete_hires`](Self::complete_hires).
    pub fn poll_timers(&mut self, now_ms: f64) -> Option<HiResJob> {
        self.gestures.poll_settle(now_ms);
        if self.overlay.poll_safety(now_ms) {
            self.scheduler.request_fast();
        }
        if !self.scheduler.poll_quality(now_ms) {
            return None;
        }
        self.plan_hires()
    }

    fn plan_hires(&mut self) -> Option<HiResJob> {
        let viewport = self.viewport.as_ref()?;
        let signal = self.signal.as_ref()?;
        let view = viewport.view();
        let scale = self.surface.scale();
        let covered = self
            .surface
            .active()
            .is_some_and(|a| a.serves(&view, scale, self.playback_rate) && a.raster.height == self.detail.device_height());

        let plan = match plan_quality(
            view,
            viewport.data(),
            self.detail.device_width(),
            signal.sample_rate,
            &self.config,
            covered,
        ) {
            QualityDecision::Render(plan) => plan,
            other => {
                log::debug!("Quality render skipped: {other:?}");
                return None;
            }
        };

        let generation = self.surface.issue();
        let request = HiResRequest {
            generation,
            key: SurfaceKey { padded: plan.padded, scale, playback_rate: self.playback_rate },
            columns: plan.columns,
            height: self.detail.device_height(),
        };
        match HiResJob::new(
            request,
            signal.clone(),
            self.config.pyramid.fft_size,
            self.config.min_transform_window(),
            self.config.db_floor,
        ) {
            Ok(job) => Some(job),
            Err(RenderError::InsufficientSamples { available, required }) => {
                log::debug!("Keeping current texture: {available} samples < {required}");
                None
            }
            Err(e) => {
                log::debug!("Quality render not started: {e}");
                None
            }
        }
    }

    /// True while `generation` is still the latest issued request. Jobs
    /// check this between chunks and stop early when superseded.
    pub fn is_current(&self, generation: u64) -> bool {
        self.surface.latest_generation() == generation
    }

    pub fn complete_hires(&mut self, surface: RenderSurface, now_ms: f64) -> Completion {
        let generation = surface.generation;
        let completion = self.surface.complete(surface, now_ms);
        match completion {
            Completion::Discarded { .. } => return completion,
            Completion::CrossfadeStarted => self.pause_indicator(),
            Completion::Applied => {}
        }
        self.events.push(EngineEvent::RenderApplied { generation });
        self.scheduler.request_fast();
        completion
    }

    // ── Regions and features ────────────────────────────────────────────────

    pub fn regions(&self) -> &[Region] {
        self.store.regions()
    }

    pub fn active_region(&self) -> Option<&Region> {
        let id = self.viewport.as_ref()?.active_region()?;
        self.store.region(id)
    }

    pub fn set_gate(&mut self, gate: Box<dyn RegionGate>) {
        self.gate = gate;
    }

    pub fn overlay_message(&self) -> Option<&str> {
        self.overlay.message()
    }

    pub fn clear_overlay_message(&mut self) {
        self.overlay.clear_message();
    }

    pub fn editing(&self) -> Option<usize> {
        self.overlay.editing()
    }

    pub fn create_region(&mut self, range: TimeRange) -> Result<RegionId, StoreError> {
        let id = self.store.create_region(range)?;
        self.scheduler.request_fast();
        Ok(id)
    }

    pub fn delete_region(&mut self, id: RegionId, now_ms: f64) -> Result<(), StoreError> {
        self.store.delete_region(id)?;
        if self.viewport.as_ref().and_then(|v| v.active_region()) == Some(id) {
            if let Some(viewport) = self.viewport.as_mut() {
                viewport.exit_region();
            }
            self.overlay.cancel();
            self.overlay.set_editing(None);
            self.after_view_change(now_ms);
        }
        self.scheduler.request_fast();
        Ok(())
    }

    fn active_region_id(&self) -> Result<RegionId, StoreError> {
        self.viewport
            .as_ref()
            .and_then(|v| v.active_region())
            .ok_or(StoreError::UnknownRegion(RegionId(0)))
    }

    pub fn delete_feature(&mut self, index: usize) -> Result<(), StoreError> {
        let id = self.active_region_id()?;
        self.store.delete_feature(id, index)?;
        self.overlay.set_editing(None);
        self.scheduler.request_fast();
        Ok(())
    }

    pub fn set_feature_notes(&mut self, index: usize, notes: &str) -> Result<(), StoreError> {
        let id = self.active_region_id()?;
        self.store.set_feature_notes(id, index, notes)
    }

    pub fn set_feature_type(&mut self, index: usize, feature_type: FeatureType) -> Result<(), StoreError> {
        let id = self.active_region_id()?;
        self.store.set_feature_type(id, index, feature_type)?;
        self.scheduler.request_fast();
        Ok(())
    }

    pub fn select_feature(&mut self, index: Option<usize>) {
        self.overlay.set_editing(index);
        self.scheduler.request_fast();
    }
}
