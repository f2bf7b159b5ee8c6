//! Feature rectangles on the transparent overlay layer.
//!
//! The overlay keeps no copy of feature data: boxes are a render-time
//! projection rebuilt wholesale from the region on every redraw and after
//! every mutation. The drag machine is idle → dragging → drag-confirmed;
//! only a confirmed release reaches the store.

use crate::config::OverlayConfig;
use crate::coords::{CoordinateTransform, PixelRect};
use crate::error::StoreError;
use crate::resource::{DrawingResource, REFRESH_MESSAGE};
use crate::store::{FeatureStore, RegionGate};
use crate::timer::CancellableTimer;
use crate::types::{Region, RegionId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayBox {
    pub index: usize,
    pub rect: PixelRect,
    pub editing: bool,
}

/// Every complete feature of `region`, in index order.
pub fn project_boxes(region: Option<&Region>, transform: &CoordinateTransform, editing: Option<usize>) -> Vec<OverlayBox> {
    let Some(region) = region else { return Vec::new() };
    let mut boxes: Vec<OverlayBox> = region
        .complete_features()
        .filter_map(|f| {
            let (start, end, low, high) = f.bounds()?;
            Some(OverlayBox {
                index: f.index,
                rect: transform.rect_for(start, end, low, high),
                editing: editing == Some(f.index),
            })
        })
        .collect();
    boxes.sort_by_key(|b| b.index);
    boxes
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { origin: (f64, f64), current: (f64, f64) },
    DragConfirmed { origin: (f64, f64), current: (f64, f64) },
}

#[derive(Clone, Debug, PartialEq)]
pub enum PressOutcome {
    Started,
    /// The press landed inside an existing box; that feature is now being
    /// edited.
    Reselected(usize),
    /// Drags are not permitted right now.
    Blocked { hint: Option<String> },
    /// Not inside a region.
    NoRegion,
    /// The overlay surface is gone for good; the refresh message is set.
    ResourceFailed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReleaseOutcome {
    NotDragging,
    /// Released below the drag threshold.
    Cancelled,
    Created(usize),
    Updated(usize),
    Rejected(StoreError),
}

pub struct AnnotationOverlay {
    state: DragState,
    safety: CancellableTimer,
    threshold_px: f64,
    editing: Option<usize>,
    boxes: Vec<OverlayBox>,
    message: Option<String>,
}

impl AnnotationOverlay {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            state: DragState::Idle,
            safety: CancellableTimer::new(config.drag_safety_ms),
            threshold_px: config.drag_threshold_px,
            editing: None,
            boxes: Vec::new(),
            message: None,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn boxes(&self) -> &[OverlayBox] {
        &self.boxes
    }

    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    pub fn set_editing(&mut self, index: Option<usize>) {
        self.editing = index;
    }

    /// User-visible message (hint or refresh request), if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn safety_deadline(&self) -> Option<f64> {
        self.safety.deadline()
    }

    /// Rebuild every box from `region`.
    pub fn rebuild(&mut self, region: Option<&Region>, transform: &CoordinateTransform) {
        if let Some(i) = self.editing {
            if region.and_then(|r| r.feature(i)).is_none() {
                self.editing = None;
            }
        }
        self.boxes = project_boxes(region, transform, self.editing);
    }

    pub fn hit_test(&self, x: f64, y: f64) -> Option<usize> {
        // Topmost (last drawn) box wins.
        self.boxes.iter().rev().find(|b| b.rect.contains(x, y)).map(|b| b.index)
    }

    /// Live rubber-band rectangle while dragging.
    pub fn drag_rect(&self) -> Option<PixelRect> {
        match self.state {
            DragState::Dragging { origin, current } | DragState::DragConfirmed { origin, current } => {
                Some(PixelRect::from_corners(origin.0, origin.1, current.0, current.1))
            }
            DragState::Idle => None,
        }
    }

    /// Press at logical `(x, y)`. The overlay surface is checked first.
    pub fn press(
        &mut self,
        x: f64,
        y: f64,
        region: Option<&Region>,
        gate: &dyn RegionGate,
        resource: &mut dyn DrawingResource,
        transform: &CoordinateTransform,
        now_ms: f64,
    ) -> PressOutcome {
        if resource.ensure_ready().is_err() {
            self.message = Some(REFRESH_MESSAGE.to_string());
            self.state = DragState::Idle;
            return PressOutcome::ResourceFailed;
        }
        let Some(region) = region else { return PressOutcome::NoRegion };

        // A closed gate also blocks reselection: the next drag would edit.
        if !gate.permits_region_creation() {
            let hint = gate.hint();
            self.message = hint.clone();
            return PressOutcome::Blocked { hint };
        }
        self.rebuild(Some(region), transform);
        if let Some(index) = self.hit_test(x, y) {
            self.editing = Some(index);
            self.rebuild(Some(region), transform);
            return PressOutcome::Reselected(index);
        }
        self.message = None;
        self.state = DragState::Dragging { origin: (x, y), current: (x, y) };
        self.safety.arm(now_ms);
        PressOutcome::Started
    }

    /// Track the pointer. Returns true once the drag is confirmed. Every
    /// move of a live drag pushes the safety deadline back.
    pub fn drag_to(&mut self, x: f64, y: f64, now_ms: f64) -> bool {
        if self.state != DragState::Idle {
            self.safety.arm(now_ms);
        }
        self.track(x, y)
    }

    fn track(&mut self, x: f64, y: f64) -> bool {
        match self.state {
            DragState::Dragging { origin, .. } => {
                let confirmed =
                    (x - origin.0).abs() >= self.threshold_px || (y - origin.1).abs() >= self.threshold_px;
                self.state = if confirmed {
                    DragState::DragConfirmed { origin, current: (x, y) }
                } else {
                    DragState::Dragging { origin, current: (x, y) }
                };
                confirmed
            }
            DragState::DragConfirmed { origin, .. } => {
                self.state = DragState::DragConfirmed { origin, current: (x, y) };
                true
            }
            DragState::Idle => false,
        }
    }

    /// Finish the drag. A confirmed drag becomes a new feature, or new bounds
    /// for the feature being edited; the overlay then rebuilds.
    pub fn release(
        &mut self,
        x: f64,
        y: f64,
        store: &mut dyn FeatureStore,
        region: RegionId,
        transform: &CoordinateTransform,
    ) -> ReleaseOutcome {
        self.track(x, y);
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        self.safety.cancel();

        let (origin, current) = match state {
            DragState::Idle => return ReleaseOutcome::NotDragging,
            DragState::Dragging { .. } => return ReleaseOutcome::Cancelled,
            DragState::DragConfirmed { origin, current } => (origin, current),
        };
        let Some(limits) = store.region(region).map(|r| r.range()) else {
            return ReleaseOutcome::Rejected(StoreError::UnknownRegion(region));
        };

        let rect = PixelRect::from_corners(origin.0, origin.1, current.0, current.1);
        let draft = transform.draft_from_rect(&rect, limits);
        let result = match self.editing.take() {
            Some(index) => store
                .update_feature_bounds(region, index, &draft)
                .map(|_| ReleaseOutcome::Updated(index))
                .inspect_err(|_| self.editing = Some(index)),
            None => store.create_feature(region, &draft).map(ReleaseOutcome::Created),
        };
        let outcome = result.unwrap_or_else(|e| {
            log::debug!("Drag rejected: {e}");
            ReleaseOutcome::Rejected(e)
        });
        self.rebuild(store.region(region), transform);
        outcome
    }

    /// Abort an in-progress drag without touching the store.
    pub fn cancel(&mut self) -> bool {
        self.safety.cancel();
        !matches!(std::mem::replace(&mut self.state, DragState::Idle), DragState::Idle)
    }

    /// Force the drag back to idle if release never arrived.
    pub fn poll_safety(&mut self, now_ms: f64) -> bool {
        if self.safety.fire_if_due(now_ms) {
            log::debug!("Drag safety timeout; returning to idle");
            self.state = DragState::Idle;
            return true;
        }
        false
    }
}
