pub mod app;
pub mod overview;
pub mod pinch;
pub mod spectrogram;
pub mod toolbar;
pub mod waveform;
