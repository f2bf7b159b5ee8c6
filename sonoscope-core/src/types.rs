use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A loaded mono signal anchored at an absolute timestamp.
#[derive(Clone, Debug)]
pub struct Signal {
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
    /// Absolute time (seconds) of sample 0.
    pub start_time: f64,
}

impl Signal {
    pub fn new(samples: Vec<f32>, sample_rate: u32, start_time: f64) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            start_time,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration_secs()
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    pub fn span(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time())
    }
}

/// Half-open `[start, end)` range of absolute timestamps in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// True when `other` lies entirely inside this range.
    pub fn covers(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.end > self.start
    }

    /// Grow by `fraction` of the width on each side, clamped to `bounds`.
    pub fn padded(&self, fraction: f64, bounds: &TimeRange) -> TimeRange {
        let pad = self.width() * fraction.max(0.0);
        TimeRange::new(
            (self.start - pad).max(bounds.start),
            (self.end + pad).min(bounds.end),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A user-defined time sub-range that holds annotations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub start_time: f64,
    pub end_time: f64,
    pub start_sample: u64,
    pub end_sample: u64,
    pub features: Vec<Feature>,
}

impl Region {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn complete_features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.is_complete())
    }

    pub fn feature(&self, index: usize) -> Option<&Feature> {
        self.features.iter().find(|f| f.index == index)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    #[default]
    Unlabelled,
    Tonal,
    Broadband,
    Pulsed,
    Other,
}

impl FeatureType {
    pub const ALL: [FeatureType; 5] = [
        FeatureType::Unlabelled,
        FeatureType::Tonal,
        FeatureType::Broadband,
        FeatureType::Pulsed,
        FeatureType::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FeatureType::Unlabelled => "Unlabelled",
            FeatureType::Tonal => "Tonal",
            FeatureType::Broadband => "Broadband",
            FeatureType::Pulsed => "Pulsed",
            FeatureType::Other => "Other",
        }
    }
}

/// A time × frequency rectangle drawn inside a region.
///
/// `index` is the 1-based number shown on the overlay. Bounds are optional
/// because the annotation workflow can create a feature before it is drawn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub index: usize,
    pub low_freq: Option<f64>,
    pub high_freq: Option<f64>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub notes: String,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
}

impl Feature {
    pub fn is_complete(&self) -> bool {
        self.low_freq.is_some()
            && self.high_freq.is_some()
            && self.start_time.is_some()
            && self.end_time.is_some()
    }

    /// Bounds as `(start, end, low, high)` when complete.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.start_time?, self.end_time?, self.low_freq?, self.high_freq?))
    }

    pub fn apply_draft(&mut self, draft: &FeatureDraft) {
        self.start_time = Some(draft.start_time);
        self.end_time = Some(draft.end_time);
        self.low_freq = Some(draft.low_freq);
        self.high_freq = Some(draft.high_freq);
    }
}

/// Domain-space rectangle produced by a confirmed drag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureDraft {
    pub start_time: f64,
    pub end_time: f64,
    pub low_freq: f64,
    pub high_freq: f64,
}

impl FeatureDraft {
    /// Build a draft from two arbitrary corners, ordering each axis.
    pub fn from_corners(t0: f64, t1: f64, f0: f64, f1: f64) -> Self {
        Self {
            start_time: t0.min(t1),
            end_time: t0.max(t1),
            low_freq: f0.min(f1),
            high_freq: f0.max(f1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end_time <= self.start_time || self.high_freq <= self.low_freq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_completeness_requires_all_bounds() {
        let mut f = Feature {
            index: 1,
            start_time: Some(1.0),
            end_time: Some(2.0),
            low_freq: Some(100.0),
            ..Default::default()
        };
        assert!(!f.is_complete());
        f.high_freq = Some(500.0);
        assert!(f.is_complete());
        assert_eq!(f.bounds(), Some((1.0, 2.0, 100.0, 500.0)));
    }

    #[test]
    fn padded_range_is_clamped_to_bounds() {
        let bounds = TimeRange::new(0.0, 100.0);
        let view = TimeRange::new(10.0, 30.0);
        let padded = view.padded(0.3, &bounds);
        assert_eq!(padded, TimeRange::new(4.0, 36.0));

        let near_start = TimeRange::new(1.0, 11.0).padded(0.3, &bounds);
        assert_eq!(near_start.start, 0.0);
        assert_eq!(near_start.end, 14.0);
    }

    #[test]
    fn draft_orders_corners() {
        let d = FeatureDraft::from_corners(5.0, 2.0, 800.0, 200.0);
        assert_eq!(d.start_time, 2.0);
        assert_eq!(d.end_time, 5.0);
        assert_eq!(d.low_freq, 200.0);
        assert_eq!(d.high_freq, 800.0);
        assert!(!d.is_empty());
    }

    #[test]
    fn feature_type_serializes_under_type_key() {
        let f = Feature {
            index: 2,
            feature_type: FeatureType::Tonal,
            ..Default::default()
        };
        let json = serde_json::to_string(&f).unwrap();
        assert!(json.contains("\"type\":\"tonal\""), "{json}");
    }
}
