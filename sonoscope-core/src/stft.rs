use realfft::{RealFftPlanner, RealToComplex};
use realfft::num_complex::Complex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

thread_local! {
    static FFT_PLANNER: RefCell<RealFftPlanner<f32>> = RefCell::new(RealFftPlanner::new());
    static HANN_CACHE: RefCell<HashMap<usize, Arc<Vec<f32>>>> = RefCell::new(HashMap::new());
}

fn hann_window(size: usize) -> Arc<Vec<f32>> {
    HANN_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .entry(size)
            .or_insert_with(|| {
                let denom = (size.max(2) - 1) as f32;
                Arc::new(
                    (0..size)
                        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
                        .collect(),
                )
            })
            .clone()
    })
}

/// Reusable single-column transform: Hann-windowed real FFT centred on an
/// arbitrary sample, returning dB relative to a full-scale sine.
pub(crate) struct ColumnTransform {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Arc<Vec<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// Magnitude of a full-scale sine after windowing (sum(w) / 2).
    reference: f32,
}

impl ColumnTransform {
    pub fn new(fft_size: usize) -> Self {
        let fft = FFT_PLANNER.with(|p| p.borrow_mut().plan_fft_forward(fft_size));
        let window = hann_window(fft_size);
        let reference = (window.iter().sum::<f32>() / 2.0).max(f32::MIN_POSITIVE);
        Self {
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
            window,
            reference,
        }
    }

    pub fn bins(&self) -> usize {
        self.spectrum.len()
    }

    /// Write the column's per-bin level (dB re full scale) into `out`.
    ///
    /// Frames that run past either end of `samples` are zero-padded.
    pub fn column_db(&mut self, samples: &[f32], center: f64, out: &mut [f32]) {
        let n = self.input.len();
        let first = center.round() as i64 - (n as i64) / 2;
        for (i, (inp, &w)) in self.input.iter_mut().zip(self.window.iter()).enumerate() {
            let idx = first + i as i64;
            let s = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
            *inp = s * w;
        }
        if self
            .fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .is_err()
        {
            out.iter_mut().for_each(|v| *v = f32::NEG_INFINITY);
            return;
        }
        for (o, c) in out.iter_mut().zip(self.spectrum.iter()) {
            let mag = c.norm() / self.reference;
            *o = if mag > 0.0 { 20.0 * mag.log10() } else { f32::NEG_INFINITY };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_sine_peaks_near_zero_db() {
        let sample_rate = 48_000.0f64;
        let freq = 3_000.0f64;
        let samples: Vec<f32> = (0..8192)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin() as f32)
            .collect();
        let mut t = ColumnTransform::new(1024);
        let mut out = vec![0.0f32; t.bins()];
        t.column_db(&samples, 4096.0, &mut out);

        let (peak_bin, peak_db) = out
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();
        let peak_freq = peak_bin as f64 * sample_rate / 1024.0;
        assert!((peak_freq - freq).abs() < 2.0 * sample_rate / 1024.0, "peak at {peak_freq}");
        assert!(peak_db > -3.0 && peak_db < 1.0, "peak level {peak_db}");
    }

    #[test]
    fn frames_past_the_edges_are_zero_padded() {
        let samples = vec![0.5f32; 100];
        let mut t = ColumnTransform::new(256);
        let mut out = vec![0.0f32; t.bins()];
        t.column_db(&samples, 0.0, &mut out);
        assert!(out[0].is_finite());
        t.column_db(&samples, 10_000.0, &mut out);
        assert!(out.iter().all(|v| *v == f32::NEG_INFINITY));
    }
}
