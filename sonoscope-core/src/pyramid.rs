//! Multi-resolution tile pyramid for the fast render path.
//!
//! Level 0 holds base tiles of `base_tile_secs` × `tile_columns`. Each level
//! above halves the column density by max-pooling pairs of tiles, until one
//! tile spans the whole recording:
//!
//! - level 0: 15 min / tile, 1024 columns (≈1.14 columns per second)
//! - level 1: 30 min / tile
//! - level 2: 60 min / tile, and so on
//!
//! Cropping never runs a transform: it samples whichever level best matches
//! the output column density, falling back to other levels when a tile is
//! not built yet. Tiles store linear-frequency bins so a change of frequency
//! scale is just a different crop.

use crate::config::PyramidConfig;
use crate::coords::{pixel_to_freq, pixel_to_time, FreqAxis, ScaleMapping};
use crate::raster::{db_to_level, LevelGrid, Raster};
use crate::stft::ColumnTransform;
use crate::types::{Signal, TimeRange};

pub struct Tile {
    pub level: usize,
    pub index: usize,
    pub range: TimeRange,
    pub grid: LevelGrid,
}

pub struct TilePyramid {
    data: TimeRange,
    nyquist: f64,
    bins: usize,
    base_tile_secs: f64,
    columns: usize,
    /// `levels[0]` is the finest level.
    levels: Vec<Vec<Option<Tile>>>,
}

impl TilePyramid {
    /// An empty pyramid sized for `signal`; tiles are filled by a
    /// [`PyramidBuilder`].
    pub fn new(signal: &Signal, config: &PyramidConfig) -> Self {
        let data = signal.span();
        let base_count = ((data.width() / config.base_tile_secs).ceil() as usize).max(1);
        let mut levels = Vec::new();
        let mut count = base_count;
        loop {
            levels.push((0..count).map(|_| None).collect::<Vec<_>>());
            if count == 1 {
                break;
            }
            count = count.div_ceil(2);
        }
        Self {
            data,
            nyquist: signal.nyquist(),
            bins: config.fft_size / 2 + 1,
            base_tile_secs: config.base_tile_secs,
            columns: config.tile_columns,
            levels,
        }
    }

    pub fn data(&self) -> TimeRange {
        self.data
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn columns_per_tile(&self) -> usize {
        self.columns
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn tile_count(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, Vec::len)
    }

    pub fn tile_secs(&self, level: usize) -> f64 {
        self.base_tile_secs * (1u64 << level.min(62)) as f64
    }

    /// Columns per second at `level`.
    pub fn column_density(&self, level: usize) -> f64 {
        self.columns as f64 / self.tile_secs(level)
    }

    pub fn base_density(&self) -> f64 {
        self.column_density(0)
    }

    pub fn tiles_ready(&self, level: usize) -> usize {
        self.levels
            .get(level)
            .map_or(0, |tiles| tiles.iter().filter(|t| t.is_some()).count())
    }

    pub fn is_complete(&self) -> bool {
        (0..self.levels.len()).all(|l| self.tiles_ready(l) == self.tile_count(l))
    }

    pub fn tile(&self, level: usize, index: usize) -> Option<&Tile> {
        self.levels.get(level)?.get(index)?.as_ref()
    }

    pub fn byte_len(&self) -> usize {
        self.levels
            .iter()
            .flatten()
            .flatten()
            .map(|t| t.grid.byte_len())
            .sum()
    }

    fn base_tile_range(&self, index: usize) -> TimeRange {
        let secs = self.tile_secs(0);
        let start = self.data.start + index as f64 * secs;
        TimeRange::new(start, start + secs)
    }

    pub(crate) fn insert(&mut self, tile: Tile) {
        if let Some(slot) = self
            .levels
            .get_mut(tile.level)
            .and_then(|tiles| tiles.get_mut(tile.index))
        {
            *slot = Some(tile);
        }
    }

    /// Max-pool pairs of tiles from each level into the one above.
    pub(crate) fn build_coarser_levels(&mut self) {
        for level in 1..self.levels.len() {
            for index in 0..self.levels[level].len() {
                let secs = self.tile_secs(level);
                let start = self.data.start + index as f64 * secs;
                let mut grid = LevelGrid::new(self.columns, self.bins);
                let children = [
                    self.tile(level - 1, index * 2).map(|t| &t.grid),
                    self.tile(level - 1, index * 2 + 1).map(|t| &t.grid),
                ];
                for c in 0..self.columns {
                    let u0 = c * 2;
                    let out = grid.column_mut(c);
                    for u in u0..u0 + 2 {
                        let Some(child) = children[u / self.columns] else { continue };
                        let col = u % self.columns;
                        for (bin, o) in out.iter_mut().enumerate() {
                            *o = (*o).max(child.get(col, bin));
                        }
                    }
                }
                self.levels[level][index] = Some(Tile {
                    level,
                    index,
                    range: TimeRange::new(start, start + secs),
                    grid,
                });
            }
        }
    }

    /// Coarsest level that still supplies at least `density` columns per
    /// second; level 0 when even the base is coarser than that.
    pub fn select_level(&self, density: f64) -> usize {
        let mut chosen = 0;
        for level in 0..self.levels.len() {
            if self.column_density(level) >= density {
                chosen = level;
            } else {
                break;
            }
        }
        chosen
    }

    /// Level, tile index and column holding time `t`, trying `preferred`
    /// first, then finer levels, then coarser ones.
    fn locate(&self, t: f64, preferred: usize) -> Option<(&Tile, usize)> {
        if !self.data.contains(t) {
            return None;
        }
        let order = (0..=preferred).rev().chain(preferred + 1..self.levels.len());
        for level in order {
            let secs = self.tile_secs(level);
            let index = ((t - self.data.start) / secs).floor() as usize;
            if let Some(tile) = self.tile(level, index) {
                let frac = (t - tile.range.start) / secs;
                let col = ((frac * self.columns as f64).floor() as usize).min(self.columns - 1);
                return Some((tile, col));
            }
        }
        None
    }

    /// Crop and resample the pyramid to `view` at `width × height` pixels.
    ///
    /// O(pixels); regions outside the data or not yet built are black.
    pub fn crop(
        &self,
        view: TimeRange,
        width: u32,
        height: u32,
        axis: &FreqAxis,
        mapping: ScaleMapping,
    ) -> Raster {
        let mut out = Raster::new(width, height);
        if out.is_empty() || !view.is_valid() {
            return out;
        }
        let level = self.select_level(width as f64 / view.width());
        let rows = row_bins(height, self.bins, self.nyquist, axis, mapping);

        for x in 0..width {
            let t = pixel_to_time(x as f64 + 0.5, view, width as f64);
            let Some((tile, col)) = self.locate(t, level) else { continue };
            for (y, bin) in rows.iter().enumerate() {
                if let Some(bin) = *bin {
                    out.set_grey(x, y as u32, tile.grid.get(col, bin));
                }
            }
        }
        out
    }
}

/// For each output row, the linear bin it samples (None above the data's
/// Nyquist frequency).
pub(crate) fn row_bins(
    height: u32,
    bins: usize,
    nyquist: f64,
    axis: &FreqAxis,
    mapping: ScaleMapping,
) -> Vec<Option<usize>> {
    (0..height)
        .map(|y| {
            let f = pixel_to_freq(y as f64 + 0.5, axis, height as f64, mapping);
            let frac = f / nyquist;
            if !(0.0..=1.0).contains(&frac) || bins == 0 {
                None
            } else {
                Some(((frac * (bins - 1) as f64).round() as usize).min(bins - 1))
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildProgress {
    pub done: usize,
    pub total: usize,
}

impl BuildProgress {
    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }
}

/// Fills a [`TilePyramid`] one base tile per [`step`](Self::step) so the
/// caller can yield to the event loop between tiles.
pub struct PyramidBuilder {
    signal: Signal,
    transform: ColumnTransform,
    db_floor: f32,
    next: usize,
    total: usize,
    column: Vec<f32>,
}

impl PyramidBuilder {
    pub fn new(signal: Signal, pyramid: &TilePyramid, config: &PyramidConfig, db_floor: f32) -> Self {
        let transform = ColumnTransform::new(config.fft_size);
        let column = vec![0.0; transform.bins()];
        Self {
            signal,
            transform,
            db_floor,
            next: 0,
            total: pyramid.tile_count(0),
            column,
        }
    }

    pub fn progress(&self) -> BuildProgress {
        BuildProgress { done: self.next, total: self.total }
    }

    /// Compute the next base tile. Coarser levels are built once the last
    /// base tile lands.
    pub fn step(&mut self, pyramid: &mut TilePyramid) -> BuildProgress {
        if self.next >= self.total {
            return self.progress();
        }
        let index = self.next;
        let range = pyramid.base_tile_range(index);
        let columns = pyramid.columns_per_tile();
        let sr = self.signal.sample_rate as f64;
        let data_start = self.signal.start_time;
        let mut grid = LevelGrid::new(columns, pyramid.bins());

        for c in 0..columns {
            let t = range.start + (c as f64 + 0.5) * range.width() / columns as f64;
            if t >= self.signal.end_time() {
                break;
            }
            let center = (t - data_start) * sr;
            self.transform.column_db(&self.signal.samples, center, &mut self.column);
            for (o, &db) in grid.column_mut(c).iter_mut().zip(self.column.iter()) {
                *o = db_to_level(db, self.db_floor);
            }
        }
        pyramid.insert(Tile { level: 0, index, range, grid });
        self.next += 1;

        if self.next == self.total {
            pyramid.build_coarser_levels();
            log::info!(
                "Tile pyramid ready: {} levels, {} base tiles, {:.1} MB",
                pyramid.level_count(),
                self.total,
                pyramid.byte_len() as f64 / (1024.0 * 1024.0)
            );
        }
        self.progress()
    }

    pub fn run_to_completion(&mut self, pyramid: &mut TilePyramid) {
        while !self.step(pyramid).is_complete() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::FreqScale;

    fn small_config() -> PyramidConfig {
        PyramidConfig { base_tile_secs: 2.0, tile_columns: 16, crossover: 0.8, fft_size: 64 }
    }

    /// Silence everywhere except a loud tone burst in `[on, off)` seconds.
    fn burst_signal(secs: f64, on: f64, off: f64) -> Signal {
        let sr = 1_000u32;
        let samples = (0..(secs * sr as f64) as usize)
            .map(|i| {
                let t = i as f64 / sr as f64;
                if t >= on && t < off {
                    (2.0 * std::f64::consts::PI * 125.0 * t).sin() as f32
                } else {
                    0.0
                }
            })
            .collect();
        Signal::new(samples, sr, 100.0)
    }

    fn built(signal: &Signal, cfg: &PyramidConfig) -> TilePyramid {
        let mut pyramid = TilePyramid::new(signal, cfg);
        let mut builder = PyramidBuilder::new(signal.clone(), &pyramid, cfg, -90.0);
        builder.run_to_completion(&mut pyramid);
        pyramid
    }

    #[test]
    fn level_layout_halves_until_single_tile() {
        let cfg = small_config();
        let pyramid = TilePyramid::new(&burst_signal(9.0, 0.0, 0.0), &cfg);
        let counts: Vec<usize> = (0..pyramid.level_count()).map(|l| pyramid.tile_count(l)).collect();
        assert_eq!(counts, vec![5, 3, 2, 1]);
        assert_eq!(pyramid.tile_secs(2), 8.0);
        assert_eq!(pyramid.base_density(), 8.0);
    }

    #[test]
    fn builder_fills_every_level() {
        let cfg = small_config();
        let signal = burst_signal(9.0, 3.0, 4.0);
        let mut pyramid = TilePyramid::new(&signal, &cfg);
        let mut builder = PyramidBuilder::new(signal.clone(), &pyramid, &cfg, -90.0);
        let first = builder.step(&mut pyramid);
        assert_eq!(first, BuildProgress { done: 1, total: 5 });
        assert!(!pyramid.is_complete());
        builder.run_to_completion(&mut pyramid);
        assert!(pyramid.is_complete());
    }

    #[test]
    fn select_level_prefers_coarsest_sufficient() {
        let cfg = small_config();
        let pyramid = TilePyramid::new(&burst_signal(9.0, 0.0, 0.0), &cfg);
        assert_eq!(pyramid.select_level(100.0), 0);
        assert_eq!(pyramid.select_level(8.0), 0);
        assert_eq!(pyramid.select_level(4.0), 1);
        assert_eq!(pyramid.select_level(1.5), 2);
        assert_eq!(pyramid.select_level(0.1), 3);
    }

    #[test]
    fn coarser_levels_keep_loud_columns() {
        let cfg = small_config();
        let signal = burst_signal(9.0, 3.0, 4.0);
        let pyramid = built(&signal, &cfg);
        let tone_bin = (125.0 / 500.0 * (pyramid.bins() - 1) as f64).round() as usize;
        for level in 0..pyramid.level_count() {
            let loudest = (0..pyramid.tile_count(level))
                .filter_map(|i| pyramid.tile(level, i))
                .flat_map(|t| (0..t.grid.columns).map(move |c| t.grid.get(c, tone_bin)))
                .max()
                .unwrap();
            assert!(loudest > 200, "level {level} lost the burst ({loudest})");
        }
    }

    #[test]
    fn crop_places_burst_at_expected_pixels() {
        let cfg = small_config();
        let signal = burst_signal(9.0, 3.0, 4.0);
        let pyramid = built(&signal, &cfg);
        let axis = FreqAxis::new(500.0, cfg.fft_size);
        let view = TimeRange::new(102.0, 106.0);
        let img = pyramid.crop(view, 40, 32, &axis, FreqScale::Linear.into());
        assert_eq!((img.width, img.height), (40, 32));

        // 125 Hz of 500 Hz → a quarter of the way up.
        let y = 24;
        let inside = img.pixel(15, y)[0];
        let before = img.pixel(2, y)[0];
        let after = img.pixel(35, y)[0];
        assert!(inside > 150, "burst pixel {inside}");
        assert!(before < 20 && after < 20, "silence {before} {after}");
    }

    #[test]
    fn crop_outside_data_is_black() {
        let cfg = small_config();
        let signal = burst_signal(4.0, 0.0, 4.0);
        let pyramid = built(&signal, &cfg);
        let axis = FreqAxis::new(500.0, cfg.fft_size);
        let img = pyramid.crop(TimeRange::new(0.0, 10.0), 10, 8, &axis, FreqScale::Log.into());
        assert!(img.pixels.chunks(4).all(|p| p[0] == 0 && p[3] == 255));
    }

    #[test]
    fn unbuilt_tiles_fall_back_or_stay_black() {
        let cfg = small_config();
        let signal = burst_signal(9.0, 0.0, 9.0);
        let mut pyramid = TilePyramid::new(&signal, &cfg);
        let mut builder = PyramidBuilder::new(signal.clone(), &pyramid, &cfg, -90.0);
        builder.step(&mut pyramid);
        let axis = FreqAxis::new(500.0, cfg.fft_size);
        // Whole-span crop wants a coarse level that does not exist yet; the
        // first base tile still shows through.
        let img = pyramid.crop(signal.span(), 9, 32, &axis, FreqScale::Linear.into());
        assert!(img.pixel(0, 24)[0] > 150);
        assert_eq!(img.pixel(8, 24)[0], 0);
    }
}
