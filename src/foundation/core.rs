use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};

pub use kurbo::{Point, Rect};

/// 3x3 projective transform acting on column vectors `(x, y, 1)`.
pub type Homography = nalgebra::Matrix3<f64>;

/// Owned pixel buffer in row-major premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl RgbaFrame {
    /// Allocate a fully transparent frame.
    pub fn transparent(width: u32, height: u32) -> StitchResult<Self> {
        let len = rgba8_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wrap premultiplied bytes, checking the buffer length.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> StitchResult<Self> {
        if data.len() != rgba8_len(width, height)? {
            return Err(StitchError::image(format!(
                "expected {}x{} rgba8 buffer ({} bytes), got {} bytes",
                width,
                height,
                rgba8_len(width, height)?,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Premultiply straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> StitchResult<Self> {
        premultiply_rgba8_in_place(&mut data);
        Self::from_premul(width, height, data)
    }

    /// Normalize any decoded image (gray, RGB, 16-bit, ...) to premultiplied RGBA8.
    pub fn from_dynamic(img: &image::DynamicImage) -> StitchResult<Self> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(StitchError::image("image has zero width or height"));
        }
        Self::from_straight_rgba8(width, height, rgba.into_raw())
    }

    /// Decode an encoded image file (PNG, JPEG, ...).
    pub fn open(path: &Path) -> StitchResult<Self> {
        let img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
        Self::from_dynamic(&img)
    }

    /// Premultiplied pixel at `(x, y)`; transparent outside the frame.
    pub fn pixel(&self, x: i64, y: i64) -> [u8; 4] {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return [0; 4];
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Image corners listed in (row, column) order: `(0,0), (0,W), (H,W), (H,0)`,
    /// returned as `(x, y)` points.
    pub fn corners(&self) -> [Point; 4] {
        let h = f64::from(self.height);
        let w = f64::from(self.width);
        [(0.0, 0.0), (0.0, w), (h, w), (h, 0.0)].map(|(row, col)| Point::new(col, row))
    }

    /// Convert to a straight-alpha [`image::RgbaImage`].
    pub fn to_straight_rgba_image(&self) -> StitchResult<image::RgbaImage> {
        let mut data = self.data.clone();
        unpremultiply_rgba8_in_place(&mut data);
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| StitchError::image("rgba8 buffer does not match frame dimensions"))
    }

    /// Write the frame as a straight-alpha PNG.
    pub fn save_png(&self, path: &Path) -> StitchResult<()> {
        let img = self.to_straight_rgba_image()?;
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

fn rgba8_len(width: u32, height: u32) -> StitchResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| StitchError::image(format!("{width}x{height} rgba8 buffer overflows")))
}

/// Smallest integer rectangle enclosing a point set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FittingRect {
    /// Floor of the minimum x coordinate.
    pub left: i64,
    /// Floor of the minimum y coordinate.
    pub top: i64,
    /// `ceil(max_x - left)`.
    pub width: u32,
    /// `ceil(max_y - top)`.
    pub height: u32,
}

impl FittingRect {
    /// Exclusive right edge.
    pub fn right(self) -> i64 {
        self.left + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> i64 {
        self.top + i64::from(self.height)
    }

    /// Whether `inner` lies fully inside `self`.
    pub fn contains_rect(self, inner: FittingRect) -> bool {
        inner.left >= self.left
            && inner.top >= self.top
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }
}

/// Fit an integer rectangle around `points`, rounding outward.
///
/// Returns `None` for an empty set, non-finite coordinates or sizes beyond `u32`.
pub fn fitting_rectangle<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<FittingRect> {
    let mut bounds: Option<Rect> = None;
    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        bounds = Some(match bounds {
            Some(r) => r.union_pt(*p),
            None => Rect::from_points(*p, *p),
        });
    }
    let bounds = bounds?;

    // Round each edge on its own so rectangles sharing an edge agree on it.
    let left = edge(bounds.x0.floor())?;
    let top = edge(bounds.y0.floor())?;
    let right = edge(bounds.x1.ceil())?;
    let bottom = edge(bounds.y1.ceil())?;

    Some(FittingRect {
        left,
        top,
        width: u32::try_from(right - left).ok()?,
        height: u32::try_from(bottom - top).ok()?,
    })
}

fn edge(v: f64) -> Option<i64> {
    const LIMIT: f64 = (1u64 << 53) as f64;
    (v.abs() <= LIMIT).then_some(v as i64)
}

/// Name of image `index` for messages, or `#index` when it has none.
pub(crate) fn display_name(names: &[String], index: usize) -> String {
    names
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("#{index}"))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
