pub mod colors;
pub mod overlay_renderer;
pub mod overlay_surface;
pub mod resize_watch;
pub mod spectrogram_renderer;
pub mod time_markers;
pub mod timers;
pub mod waveform_renderer;
