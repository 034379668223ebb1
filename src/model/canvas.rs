use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::color::Color;

/// A square pixel grid the interpreter draws on.
///
/// Coordinates are signed so callers can ask about positions off the grid;
/// reads there return `None` and writes there are ignored.
pub trait Surface {
    /// Side length in pixels.
    fn size(&self) -> usize;

    fn pixel(&self, x: i64, y: i64) -> Option<Color>;

    fn set_pixel(&mut self, x: i64, y: i64, color: Color);

    fn in_bounds(&self, x: i64, y: i64) -> bool {
        let size = i64::try_from(self.size()).unwrap_or(i64::MAX);
        (0..size).contains(&x) && (0..size).contains(&y)
    }
}

/// Owned `size x size` canvas. Row-major, `(0, 0)` is the top-left pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(try_from = "CanvasData")]
#[ts(export)]
pub struct Canvas {
    size: usize,
    pixels: Vec<Color>,
}

/// Unchecked wire form; deserializing a [`Canvas`] goes through [`Canvas::from_pixels`].
#[derive(Deserialize)]
struct CanvasData {
    size: usize,
    pixels: Vec<Color>,
}

impl TryFrom<CanvasData> for Canvas {
    type Error = String;

    fn try_from(data: CanvasData) -> Result<Self, Self::Error> {
        let found = data.pixels.len();
        Canvas::from_pixels(data.size, data.pixels)
            .ok_or_else(|| format!("canvas has {found} pixels, expected {0} x {0}", data.size))
    }
}

impl Canvas {
    pub fn new(size: usize, background: Color) -> Self {
        Self {
            size,
            pixels: vec![background; size * size],
        }
    }

    /// Rebuild a canvas from raw pixels. `None` if the buffer is not `size * size`.
    pub fn from_pixels(size: usize, pixels: Vec<Color>) -> Option<Self> {
        (size.checked_mul(size) == Some(pixels.len())).then_some(Self { size, pixels })
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.size && y < self.size).then(|| y * self.size + x)
    }

    /// Binary PPM (P6). Alpha is dropped.
    pub fn to_ppm(&self) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.size, self.size);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len() * 3);
        out.extend_from_slice(header.as_bytes());
        for c in &self.pixels {
            out.extend_from_slice(&[c.r, c.g, c.b]);
        }
        out
    }
}

impl Surface for Canvas {
    fn size(&self) -> usize {
        self.size
    }

    fn pixel(&self, x: i64, y: i64) -> Option<Color> {
        self.index(x, y).and_then(|i| self.pixels.get(i).copied())
    }

    fn set_pixel(&mut self, x: i64, y: i64, color: Color) {
        if let Some(slot) = self.index(x, y).and_then(|i| self.pixels.get_mut(i)) {
            *slot = color;
        }
    }
}
