//! Quality path: a dedicated transform over the padded viewport.
//!
//! A [`HiResJob`] computes its columns in chunks so the browser can yield
//! between them. The finished [`RenderSurface`] carries the generation of
//! the request that produced it; whether it is applied is decided by
//! [`SpectrogramSurface::complete`](crate::surface::SpectrogramSurface::complete).

use crate::coords::{pixel_to_time, FreqAxis, FreqScale, ScaleMapping};
use crate::error::RenderError;
use crate::pyramid::row_bins;
use crate::raster::{db_to_level, Raster};
use crate::stft::ColumnTransform;
use crate::types::{Signal, TimeRange};

/// Identity of a hi-res image: the time span it covers and the frequency
/// layout its rows were computed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceKey {
    pub padded: TimeRange,
    pub scale: FreqScale,
    pub playback_rate: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HiResRequest {
    pub generation: u64,
    pub key: SurfaceKey,
    /// Output width in device pixels across the whole padded span.
    pub columns: u32,
    pub height: u32,
}

/// A generation-stamped rendered image.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSurface {
    pub generation: u64,
    pub key: SurfaceKey,
    pub raster: Raster,
}

impl RenderSurface {
    /// True when this surface can serve `view` under `scale` at `rate`.
    pub fn serves(&self, view: &TimeRange, scale: FreqScale, playback_rate: f64) -> bool {
        self.key.scale == scale
            && self.key.playback_rate == playback_rate
            && self.key.padded.covers(view)
    }

    /// Resample the part of this surface under `view` to `width × height`.
    pub fn crop(&self, view: TimeRange, width: u32, height: u32) -> Raster {
        let mut out = Raster::new(width, height);
        let src = &self.raster;
        if out.is_empty() || src.is_empty() {
            return out;
        }
        let span = self.key.padded;
        for x in 0..width {
            let t = pixel_to_time(x as f64 + 0.5, view, width as f64);
            if !span.contains(t) {
                continue;
            }
            let sx = (((t - span.start) / span.width() * src.width as f64) as u32).min(src.width - 1);
            for y in 0..height {
                let sy = ((y as u64 * src.height as u64) / height as u64) as u32;
                let s = (sy as usize * src.width as usize + sx as usize) * 4;
                let d = (y as usize * width as usize + x as usize) * 4;
                out.pixels[d..d + 4].copy_from_slice(&src.pixels[s..s + 4]);
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Running { done: u32, total: u32 },
    Done,
}

pub struct HiResJob {
    request: HiResRequest,
    signal: Signal,
    transform: ColumnTransform,
    rows: Vec<Option<usize>>,
    raster: Raster,
    column: Vec<f32>,
    next: u32,
    db_floor: f32,
}

impl HiResJob {
    /// Prepare a job, refusing when the padded window holds fewer samples
    /// than one transform frame.
    pub fn new(
        request: HiResRequest,
        signal: Signal,
        fft_size: usize,
        min_window: usize,
        db_floor: f32,
    ) -> Result<Self, RenderError> {
        if request.columns == 0 || request.height == 0 {
            return Err(RenderError::EmptySurface);
        }
        let span = request.key.padded;
        if !span.is_valid() {
            return Err(RenderError::EmptyRange);
        }
        let available = (span.width() * signal.sample_rate as f64).floor() as usize;
        if available < min_window {
            return Err(RenderError::InsufficientSamples { available, required: min_window });
        }

        let transform = ColumnTransform::new(fft_size);
        let axis = FreqAxis::new(signal.nyquist(), fft_size)
            .with_playback_rate(request.key.playback_rate);
        let rows = row_bins(
            request.height,
            transform.bins(),
            signal.nyquist(),
            &axis,
            ScaleMapping::Fixed(request.key.scale),
        );
        let column = vec![0.0; transform.bins()];
        let raster = Raster::new(request.columns, request.height);
        Ok(Self { request, signal, transform, rows, raster, column, next: 0, db_floor })
    }

    pub fn generation(&self) -> u64 {
        self.request.generation
    }

    pub fn request(&self) -> &HiResRequest {
        &self.request
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.request.columns
    }

    /// Compute up to `chunk` more columns.
    pub fn step(&mut self, chunk: usize) -> JobStatus {
        let total = self.request.columns;
        let span = self.request.key.padded;
        let end = self.next.saturating_add(chunk.max(1) as u32).min(total);
        for x in self.next..end {
            let t = pixel_to_time(x as f64 + 0.5, span, total as f64);
            let center = (t - self.signal.start_time) * self.signal.sample_rate as f64;
            self.transform.column_db(&self.signal.samples, center, &mut self.column);
            for (y, bin) in self.rows.iter().enumerate() {
                if let Some(bin) = *bin {
                    self.raster.set_grey(x, y as u32, db_to_level(self.column[bin], self.db_floor));
                }
            }
        }
        self.next = end;
        if self.is_done() {
            JobStatus::Done
        } else {
            JobStatus::Running { done: self.next, total }
        }
    }

    pub fn into_surface(self) -> RenderSurface {
        RenderSurface {
            generation: self.request.generation,
            key: self.request.key,
            raster: self.raster,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(secs: f64, sr: u32, freq: f64) -> Signal {
        let samples = (0..(secs * sr as f64) as usize)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr as f64).sin() as f32)
            .collect();
        Signal::new(samples, sr, 0.0)
    }

    fn request(padded: TimeRange, columns: u32, height: u32) -> HiResRequest {
        HiResRequest {
            generation: 7,
            key: SurfaceKey { padded, scale: FreqScale::Linear, playback_rate: 1.0 },
            columns,
            height,
        }
    }

    #[test]
    fn too_few_samples_is_refused() {
        let signal = tone(1.0, 1_000, 100.0);
        let err = HiResJob::new(request(TimeRange::new(0.0, 0.05), 10, 10), signal, 64, 64, -90.0)
            .err()
            .unwrap();
        assert_eq!(err, RenderError::InsufficientSamples { available: 50, required: 64 });
    }

    #[test]
    fn zero_sized_target_is_refused() {
        let signal = tone(1.0, 1_000, 100.0);
        let err = HiResJob::new(request(TimeRange::new(0.0, 1.0), 0, 10), signal, 64, 64, -90.0)
            .err()
            .unwrap();
        assert_eq!(err, RenderError::EmptySurface);
    }

    #[test]
    fn job_runs_in_chunks_and_finds_the_tone() {
        let signal = tone(4.0, 1_000, 250.0);
        let mut job =
            HiResJob::new(request(TimeRange::new(1.0, 3.0), 50, 20), signal, 64, 64, -90.0).unwrap();
        assert_eq!(job.step(20), JobStatus::Running { done: 20, total: 50 });
        assert_eq!(job.step(20), JobStatus::Running { done: 40, total: 50 });
        assert_eq!(job.step(20), JobStatus::Done);
        let surface = job.into_surface();
        assert_eq!(surface.generation, 7);

        // 250 Hz of 500 Hz sits halfway up: rows 9 and 10.
        let mid = surface.raster.pixel(25, 10)[0].max(surface.raster.pixel(25, 9)[0]);
        let top = surface.raster.pixel(25, 1)[0];
        assert!(mid > 200, "tone row {mid}");
        assert!(mid > top + 60, "tone {mid} vs top {top}");
    }

    #[test]
    fn surface_serves_only_its_span_scale_and_rate() {
        let surface = RenderSurface {
            generation: 1,
            key: SurfaceKey {
                padded: TimeRange::new(10.0, 20.0),
                scale: FreqScale::Sqrt,
                playback_rate: 1.0,
            },
            raster: Raster::new(100, 10),
        };
        let inside = TimeRange::new(12.0, 18.0);
        assert!(surface.serves(&inside, FreqScale::Sqrt, 1.0));
        assert!(!surface.serves(&inside, FreqScale::Log, 1.0));
        assert!(!surface.serves(&inside, FreqScale::Sqrt, 0.5));
        assert!(!surface.serves(&TimeRange::new(5.0, 15.0), FreqScale::Sqrt, 1.0));
    }

    #[test]
    fn crop_picks_the_right_columns() {
        let mut raster = Raster::new(10, 2);
        for y in 0..2 {
            raster.set_grey(7, y, 200);
        }
        let surface = RenderSurface {
            generation: 1,
            key: SurfaceKey {
                padded: TimeRange::new(0.0, 10.0),
                scale: FreqScale::Linear,
                playback_rate: 1.0,
            },
            raster,
        };
        let out = surface.crop(TimeRange::new(5.0, 9.0), 4, 4);
        assert_eq!(out.pixel(2, 0)[0], 200);
        assert_eq!(out.pixel(2, 3)[0], 200);
        assert_eq!(out.pixel(1, 0)[0], 0);
    }
}
