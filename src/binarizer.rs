//! Binary bitmaps and the thresholding/despeckling passes that produce them.

use crate::Tuning;

/// Foreground flags on a `width * height` grid, row-major from the top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<bool>,
}

impl BinaryBitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width * height) as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Parse a picture of `#` (foreground) and `.` (background) rows.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        let data = rows.iter().flat_map(|r| r.bytes().map(|b| b == b'#')).collect();
        Self { width, height, data }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[(y * self.width + x) as usize] = value;
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// `v <= threshold` is foreground.
pub fn threshold(luma: &[u8], width: u32, height: u32, threshold: u8) -> BinaryBitmap {
    BinaryBitmap {
        width,
        height,
        data: luma.iter().map(|&v| v <= threshold).collect(),
    }
}

/// Threshold derived from mean luminance, clamped to [100, 200].
pub fn adaptive_threshold(luma: &[u8]) -> u8 {
    if luma.is_empty() {
        return 128;
    }
    let sum: u64 = luma.iter().map(|&v| v as u64).sum();
    let mean = (sum as f64 / luma.len() as f64).round() as u32;
    mean.clamp(100, 200) as u8
}

/// One majority-vote pass over interior pixels.
///
/// Every decision reads the input bitmap, so flips never cascade within a pass.
/// Border pixels are copied unchanged.
pub fn despeckle(bitmap: &BinaryBitmap, tuning: &Tuning) -> BinaryBitmap {
    let mut out = bitmap.clone();
    if bitmap.width < 3 || bitmap.height < 3 {
        return out;
    }
    for y in 1..bitmap.height - 1 {
        for x in 1..bitmap.width - 1 {
            let n = foreground_neighbors(bitmap, x, y);
            if bitmap.get(x, y) {
                if n < tuning.despeckle_remove_below {
                    out.set(x, y, false);
                }
            } else if n > tuning.despeckle_fill_above {
                out.set(x, y, true);
            }
        }
    }
    out
}

fn foreground_neighbors(bitmap: &BinaryBitmap, x: u32, y: u32) -> u8 {
    let mut count = 0;
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if (nx, ny) != (x, y) && bitmap.get(nx, ny) {
                count += 1;
            }
        }
    }
    count
}
