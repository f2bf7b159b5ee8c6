//! Platform-free core of the sonoscope viewer: viewport state, coordinate
//! mapping, gesture handling, render scheduling, the tile pyramid and hi-res
//! renders, crossfades and the annotation overlay.

pub mod annotation;
pub mod config;
pub mod coords;
pub mod crossfade;
pub mod error;
pub mod gesture;
pub mod hires;
pub mod manager;
pub mod pyramid;
pub mod raster;
pub mod resource;
pub mod scheduler;
pub mod store;
pub mod surface;
pub mod timer;
pub mod types;
pub mod viewport;

mod stft;
