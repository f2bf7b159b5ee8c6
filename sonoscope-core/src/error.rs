use crate::types::RegionId;
use thiserror::Error;

/// Rejected viewport mutations. None of these are user-visible; callers log
/// them and leave the viewport untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewportError {
    #[error("view width {width:.3}s is below the {min:.3}s minimum")]
    TooNarrow { width: f64, min: f64 },
    #[error("non-finite viewport input")]
    NonFinite,
    #[error("zoom factor {0} must be positive")]
    BadFactor(f64),
    #[error("data span is empty")]
    EmptyData,
    #[error("no data loaded")]
    NoData,
    #[error("unknown region {0}")]
    UnknownRegion(RegionId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("padded window holds {available} samples, transform needs {required}")]
    InsufficientSamples { available: usize, required: usize },
    #[error("render target has zero size")]
    EmptySurface,
    #[error("time range is empty or invalid")]
    EmptyRange,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    #[error("drawing context unavailable")]
    ContextUnavailable,
    #[error("surface detached from the document")]
    Detached,
    #[error("recreating the drawing surface failed: {0}")]
    RecreateFailed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("unknown region {0}")]
    UnknownRegion(RegionId),
    #[error("region {region} has no feature {index}")]
    UnknownFeature { region: RegionId, index: usize },
    #[error("feature rectangle is empty")]
    EmptyDraft,
    #[error("region range is empty or outside the data")]
    BadRegionRange,
}
