use nalgebra::Vector3;

use crate::foundation::core::{Homography, RgbaFrame};
use crate::foundation::error::{StitchError, StitchResult};

const W_EPS: f64 = 1e-12;

/// Resample `src` so that output pixel `p` shows source pixel `h^-1 p`.
///
/// Bilinear over premultiplied RGBA8; taps outside the source are transparent.
pub(crate) fn warp_perspective(
    src: &RgbaFrame,
    h: &Homography,
    size: (u32, u32),
) -> StitchResult<RgbaFrame> {
    let (width, height) = size;
    let mut out = RgbaFrame::transparent(width, height)?;
    if width == 0 || height == 0 {
        return Ok(out);
    }
    let inv = h
        .try_inverse()
        .ok_or_else(|| StitchError::geometry("warp homography is not invertible"))?;

    let row_len = width as usize * 4;
    for (y, row) in out.data.chunks_exact_mut(row_len).enumerate() {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let v = inv * Vector3::new(x as f64, y as f64, 1.0);
            if v.z.abs() <= W_EPS {
                continue;
            }
            px.copy_from_slice(&sample_bilinear(src, v.x / v.z, v.y / v.z));
        }
    }
    Ok(out)
}

fn sample_bilinear(src: &RgbaFrame, x: f64, y: f64) -> [u8; 4] {
    if !x.is_finite() || !y.is_finite() {
        return [0; 4];
    }
    if x <= -1.0 || y <= -1.0 || x >= f64::from(src.width) || y >= f64::from(src.height) {
        return [0; 4];
    }
    let xf = x.floor();
    let yf = y.floor();
    let tx = x - xf;
    let ty = y - yf;
    let x0 = xf as i64;
    let y0 = yf as i64;

    let taps = [
        (src.pixel(x0, y0), (1.0 - tx) * (1.0 - ty)),
        (src.pixel(x0 + 1, y0), tx * (1.0 - ty)),
        (src.pixel(x0, y0 + 1), (1.0 - tx) * ty),
        (src.pixel(x0 + 1, y0 + 1), tx * ty),
    ];
    let mut acc = [0.0f64; 4];
    for (px, w) in taps {
        if w == 0.0 {
            continue;
        }
        for (a, c) in acc.iter_mut().zip(px) {
            *a += f64::from(c) * w;
        }
    }
    let mut out = acc.map(|v| v.round().clamp(0.0, 255.0) as u8);
    // Premultiplied invariant: color never exceeds alpha.
    for c in 0..3 {
        out[c] = out[c].min(out[3]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/vision/warp.rs"]
mod tests;
