//! Greedy rectangle packing of a binary bitmap.
//!
//! Pixels are visited in row-major order. Each uncovered foreground pixel
//! seeds a rectangle that grows right as far as it can, then down while the
//! whole row span stays foreground and uncovered. The result is deterministic
//! and covers the foreground exactly, without overlaps; it is not guaranteed
//! to use the fewest rectangles.

use crate::binarizer::BinaryBitmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

pub fn pack_rectangles(bitmap: &BinaryBitmap) -> Vec<Rectangle> {
    let w = bitmap.width as usize;
    let h = bitmap.height as usize;
    let mut covered = vec![false; w * h];
    let free = |covered: &[bool], i: usize| bitmap.data[i] && !covered[i];

    let mut rects = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if !free(&covered, y * w + x) {
                continue;
            }

            let mut rw = 1;
            while x + rw < w && free(&covered, y * w + x + rw) {
                rw += 1;
            }

            let mut rh = 1;
            while y + rh < h {
                let row = (y + rh) * w + x;
                if !(row..row + rw).all(|i| free(&covered, i)) {
                    break;
                }
                rh += 1;
            }

            for dy in 0..rh {
                let row = (y + dy) * w + x;
                covered[row..row + rw].fill(true);
            }
            rects.push(Rectangle::new(x as u32, y as u32, rw as u32, rh as u32));
        }
    }
    rects
}
