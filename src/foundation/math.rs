use crate::foundation::core::Homography;

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255_u8(u16::from(px[0]), a);
        px[1] = mul_div255_u8(u16::from(px[1]), a);
        px[2] = mul_div255_u8(u16::from(px[2]), a);
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

/// Pure translation by `(dx, dy)`.
pub fn translation(dx: f64, dy: f64) -> Homography {
    Homography::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0)
}

/// Scale `h` so that `h[(2, 2)] == 1` when that entry is usable.
pub(crate) fn normalize_homography(h: Homography) -> Homography {
    let s = h[(2, 2)];
    if s.is_finite() && s.abs() > f64::EPSILON {
        h / s
    } else {
        h
    }
}

pub(crate) fn is_finite_homography(h: &Homography) -> bool {
    h.iter().all(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
