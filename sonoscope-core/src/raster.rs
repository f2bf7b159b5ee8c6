//! RGBA images and the greyscale level map shared by the pyramid and
//! the hi-res renderer.

/// RGBA pixel buffer, row-major, row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self { width, height, pixels }
    }

    pub fn empty() -> Self {
        Self { width: 0, height: 0, pixels: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn same_size(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    pub fn set_grey(&mut self, x: u32, y: u32, grey: u8) {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[idx] = grey;
        self.pixels[idx + 1] = grey;
        self.pixels[idx + 2] = grey;
        self.pixels[idx + 3] = 255;
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// `old·(1−α) + new·α`. Mismatched sizes yield `new` unchanged.
    pub fn blend(old: &Raster, new: &Raster, alpha: f64) -> Raster {
        let a = alpha.clamp(0.0, 1.0) as f32;
        if !old.same_size(new) || a >= 1.0 {
            return new.clone();
        }
        let pixels = old
            .pixels
            .iter()
            .zip(new.pixels.iter())
            .map(|(&o, &n)| (o as f32 * (1.0 - a) + n as f32 * a).round() as u8)
            .collect();
        Raster { width: new.width, height: new.height, pixels }
    }
}

/// Quantise a dB level into 0..=255, mapping `db_floor` (and below) to 0 and
/// 0 dB (and above) to 255.
pub fn db_to_level(db: f32, db_floor: f32) -> u8 {
    if !db.is_finite() || db <= db_floor {
        return 0;
    }
    let clamped = db.min(0.0);
    ((clamped - db_floor) / -db_floor * 255.0).round() as u8
}

/// Column-major grid of quantised levels: `columns × bins`, bin 0 = 0 Hz.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelGrid {
    pub columns: usize,
    pub bins: usize,
    pub levels: Vec<u8>,
}

impl LevelGrid {
    pub fn new(columns: usize, bins: usize) -> Self {
        Self { columns, bins, levels: vec![0; columns * bins] }
    }

    #[inline]
    pub fn get(&self, column: usize, bin: usize) -> u8 {
        self.levels[column * self.bins + bin]
    }

    pub fn column_mut(&mut self, column: usize) -> &mut [u8] {
        let start = column * self.bins;
        &mut self.levels[start..start + self.bins]
    }

    pub fn byte_len(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_map_covers_dynamic_range() {
        assert_eq!(db_to_level(f32::NEG_INFINITY, -90.0), 0);
        assert_eq!(db_to_level(-120.0, -90.0), 0);
        assert_eq!(db_to_level(0.0, -90.0), 255);
        assert_eq!(db_to_level(6.0, -90.0), 255);
        assert_eq!(db_to_level(-45.0, -90.0), 128);
    }

    #[test]
    fn blend_mixes_linearly() {
        let mut a = Raster::new(2, 1);
        let mut b = Raster::new(2, 1);
        a.set_grey(0, 0, 0);
        b.set_grey(0, 0, 200);
        let mid = Raster::blend(&a, &b, 0.5);
        assert_eq!(mid.pixel(0, 0), [100, 100, 100, 255]);
        assert_eq!(Raster::blend(&a, &b, 1.0), b);
        assert_eq!(Raster::blend(&a, &b, 0.0).pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn blend_with_mismatched_sizes_returns_new() {
        let a = Raster::new(2, 2);
        let b = Raster::new(3, 1);
        assert_eq!(Raster::blend(&a, &b, 0.2), b);
    }
}
