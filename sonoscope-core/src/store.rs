//! Region / feature collaborators.
//!
//! The engine reads regions to draw overlays and frame region views, and
//! calls into a [`FeatureStore`] only on confirmed drags and explicit edit
//! commands. [`MemoryRegionStore`] is the in-process implementation.

use crate::error::StoreError;
use crate::types::{Feature, FeatureDraft, FeatureType, Region, RegionId, TimeRange};

pub trait FeatureStore {
    fn regions(&self) -> &[Region];

    fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions().iter().find(|r| r.id == id)
    }

    fn create_region(&mut self, range: TimeRange) -> Result<RegionId, StoreError>;
    fn delete_region(&mut self, id: RegionId) -> Result<(), StoreError>;

    /// Append a feature; returns its 1-based index.
    fn create_feature(&mut self, region: RegionId, draft: &FeatureDraft) -> Result<usize, StoreError>;
    fn update_feature_bounds(&mut self, region: RegionId, index: usize, draft: &FeatureDraft) -> Result<(), StoreError>;
    fn set_feature_notes(&mut self, region: RegionId, index: usize, notes: &str) -> Result<(), StoreError>;
    fn set_feature_type(&mut self, region: RegionId, index: usize, feature_type: FeatureType) -> Result<(), StoreError>;
    /// Remove a feature; later features are renumbered to keep indices
    /// contiguous from 1.
    fn delete_feature(&mut self, region: RegionId, index: usize) -> Result<(), StoreError>;
}

/// Whether drags may start right now, plus the hint to show when not.
pub trait RegionGate {
    fn permits_region_creation(&self) -> bool;
    fn hint(&self) -> Option<String>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct StaticGate {
    pub permitted: bool,
    pub hint: String,
}

impl Default for StaticGate {
    fn default() -> Self {
        Self { permitted: true, hint: String::new() }
    }
}

impl RegionGate for StaticGate {
    fn permits_region_creation(&self) -> bool {
        self.permitted
    }

    fn hint(&self) -> Option<String> {
        (!self.hint.is_empty()).then(|| self.hint.clone())
    }
}

pub struct MemoryRegionStore {
    data: TimeRange,
    sample_rate: u32,
    next_id: u32,
    regions: Vec<Region>,
}

impl MemoryRegionStore {
    pub fn new(data: TimeRange, sample_rate: u32) -> Self {
        Self { data, sample_rate, next_id: 1, regions: Vec::new() }
    }

    fn region_mut(&mut self, id: RegionId) -> Result<&mut Region, StoreError> {
        self.regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::UnknownRegion(id))
    }

    fn feature_mut(&mut self, region: RegionId, index: usize) -> Result<&mut Feature, StoreError> {
        self.region_mut(region)?
            .features
            .iter_mut()
            .find(|f| f.index == index)
            .ok_or(StoreError::UnknownFeature { region, index })
    }

    fn sample_of(&self, t: f64) -> u64 {
        ((t - self.data.start) * self.sample_rate as f64).round().max(0.0) as u64
    }
}

impl FeatureStore for MemoryRegionStore {
    fn regions(&self) -> &[Region] {
        &self.regions
    }

    fn create_region(&mut self, range: TimeRange) -> Result<RegionId, StoreError> {
        let start = range.start.max(self.data.start);
        let end = range.end.min(self.data.end);
        if !range.is_valid() || end <= start {
            return Err(StoreError::BadRegionRange);
        }
        let id = RegionId(self.next_id);
        self.next_id += 1;
        let region = Region {
            id,
            start_time: start,
            end_time: end,
            start_sample: self.sample_of(start),
            end_sample: self.sample_of(end),
            features: Vec::new(),
        };
        self.regions.push(region);
        self.regions.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        log::info!("Created region {id} [{start:.3}s, {end:.3}s)");
        Ok(id)
    }

    fn delete_region(&mut self, id: RegionId) -> Result<(), StoreError> {
        let before = self.regions.len();
        self.regions.retain(|r| r.id != id);
        if self.regions.len() == before {
            return Err(StoreError::UnknownRegion(id));
        }
        Ok(())
    }

    fn create_feature(&mut self, region: RegionId, draft: &FeatureDraft) -> Result<usize, StoreError> {
        if draft.is_empty() {
            return Err(StoreError::EmptyDraft);
        }
        let r = self.region_mut(region)?;
        let index = r.features.len() + 1;
        let mut feature = Feature { index, ..Feature::default() };
        feature.apply_draft(draft);
        r.features.push(feature);
        Ok(index)
    }

    fn update_feature_bounds(&mut self, region: RegionId, index: usize, draft: &FeatureDraft) -> Result<(), StoreError> {
        if draft.is_empty() {
            return Err(StoreError::EmptyDraft);
        }
        self.feature_mut(region, index)?.apply_draft(draft);
        Ok(())
    }

    fn set_feature_notes(&mut self, region: RegionId, index: usize, notes: &str) -> Result<(), StoreError> {
        self.feature_mut(region, index)?.notes = notes.to_string();
        Ok(())
    }

    fn set_feature_type(&mut self, region: RegionId, index: usize, feature_type: FeatureType) -> Result<(), StoreError> {
        self.feature_mut(region, index)?.feature_type = feature_type;
        Ok(())
    }

    fn delete_feature(&mut self, region: RegionId, index: usize) -> Result<(), StoreError> {
        let r = self.region_mut(region)?;
        let pos = r
            .features
            .iter()
            .position(|f| f.index == index)
            .ok_or(StoreError::UnknownFeature { region, index })?;
        r.features.remove(pos);
        for (i, f) in r.features.iter_mut().enumerate() {
            f.index = i + 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (MemoryRegionStore, RegionId) {
        let mut s = MemoryRegionStore::new(TimeRange::new(0.0, 600.0), 48_000);
        let id = s.create_region(TimeRange::new(100.0, 160.0)).unwrap();
        (s, id)
    }

    fn draft(t0: f64) -> FeatureDraft {
        FeatureDraft::from_corners(t0, t0 + 2.0, 1_000.0, 4_000.0)
    }

    #[test]
    fn region_samples_follow_times() {
        let (s, id) = store();
        let r = s.region(id).unwrap();
        assert_eq!((r.start_sample, r.end_sample), (4_800_000, 7_680_000));
    }

    #[test]
    fn region_outside_data_is_rejected() {
        let (mut s, _) = store();
        assert_eq!(s.create_region(TimeRange::new(700.0, 800.0)), Err(StoreError::BadRegionRange));
        assert_eq!(s.create_region(TimeRange::new(5.0, 5.0)), Err(StoreError::BadRegionRange));
    }

    #[test]
    fn features_are_numbered_and_renumbered() {
        let (mut s, id) = store();
        assert_eq!(s.create_feature(id, &draft(101.0)).unwrap(), 1);
        assert_eq!(s.create_feature(id, &draft(110.0)).unwrap(), 2);
        assert_eq!(s.create_feature(id, &draft(120.0)).unwrap(), 3);
        s.delete_feature(id, 1).unwrap();
        let r = s.region(id).unwrap();
        let indices: Vec<usize> = r.features.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(r.features[0].start_time, Some(110.0));
    }

    #[test]
    fn edits_target_the_right_feature() {
        let (mut s, id) = store();
        s.create_feature(id, &draft(101.0)).unwrap();
        s.set_feature_notes(id, 1, "harmonic stack").unwrap();
        s.set_feature_type(id, 1, FeatureType::Tonal).unwrap();
        s.update_feature_bounds(id, 1, &draft(130.0)).unwrap();
        let f = s.region(id).unwrap().feature(1).unwrap();
        assert_eq!(f.notes, "harmonic stack");
        assert_eq!(f.feature_type, FeatureType::Tonal);
        assert_eq!(f.start_time, Some(130.0));
        assert_eq!(
            s.set_feature_notes(id, 9, "x"),
            Err(StoreError::UnknownFeature { region: id, index: 9 })
        );
    }

    #[test]
    fn empty_drafts_are_refused() {
        let (mut s, id) = store();
        let flat = FeatureDraft::from_corners(101.0, 102.0, 500.0, 500.0);
        assert_eq!(s.create_feature(id, &flat), Err(StoreError::EmptyDraft));
    }

    #[test]
    fn gate_reports_hint_only_when_set() {
        let gate = StaticGate { permitted: false, hint: "Finish the tutorial first".into() };
        assert!(!gate.permits_region_creation());
        assert_eq!(gate.hint().as_deref(), Some("Finish the tutorial first"));
        assert_eq!(StaticGate::default().hint(), None);
    }
}
