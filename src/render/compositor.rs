//! Painter's-algorithm compositing of warped images onto the panorama canvas.

use rayon::prelude::*;

use crate::compose::planner::StitchPlan;
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::{mul_div255_u8, translation};
use crate::vision::VisionPrimitives;

/// A premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over: `dst * (255 - src.a) / 255 + src`.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src == [0, 0, 0, 0] {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

/// Blend `tile` over `canvas` with its top-left corner at `(x, y)`.
///
/// The tile must lie fully inside the canvas.
pub fn paste_over(canvas: &mut RgbaFrame, tile: &RgbaFrame, x: i64, y: i64) -> StitchResult<()> {
    if x < 0
        || y < 0
        || x + i64::from(tile.width) > i64::from(canvas.width)
        || y + i64::from(tile.height) > i64::from(canvas.height)
    {
        return Err(StitchError::geometry(format!(
            "{}x{} tile at ({x}, {y}) exceeds {}x{} canvas",
            tile.width, tile.height, canvas.width, canvas.height
        )));
    }
    if tile.width == 0 || tile.height == 0 {
        return Ok(());
    }

    let cw = canvas.width as usize * 4;
    let tw = tile.width as usize * 4;
    let (x, y) = (x as usize * 4, y as usize);
    for (row, src_row) in tile.data.chunks_exact(tw).enumerate() {
        let start = (y + row) * cw + x;
        let dst_row = &mut canvas.data[start..start + tw];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Warp `frame` into its own fitting rectangle.
///
/// The combined transform first maps the image into the center frame, then shifts the
/// rectangle's top-left corner to the origin.
pub(crate) fn warp_into_rect(
    plan: &StitchPlan,
    index: usize,
    frame: &RgbaFrame,
    vision: &dyn VisionPrimitives,
) -> StitchResult<RgbaFrame> {
    let placement = plan.images.get(index).ok_or_else(|| {
        StitchError::Other(anyhow::anyhow!("plan has no placement for image {index}"))
    })?;
    let rect = placement.rect;
    let shift = translation(-(rect.left as f64), -(rect.top as f64));
    let h = shift * placement.transform;
    let tile = vision.warp_image(frame, &h, (rect.width, rect.height))?;
    if (tile.width, tile.height) != (rect.width, rect.height) {
        return Err(StitchError::geometry(format!(
            "warp of '{}' returned {}x{}, expected {}x{}",
            placement.name, tile.width, tile.height, rect.width, rect.height
        )));
    }
    Ok(tile)
}

/// Paint every image of `plan` onto a fresh transparent canvas.
///
/// With a pool the warps run in parallel; pasting always follows `plan.draw_order`.
pub(crate) fn composite(
    plan: &StitchPlan,
    frames: &[&RgbaFrame],
    vision: &dyn VisionPrimitives,
    pool: Option<&rayon::ThreadPool>,
) -> StitchResult<RgbaFrame> {
    if frames.len() != plan.images.len() {
        return Err(StitchError::Other(anyhow::anyhow!(
            "plan has {} placements for {} images",
            plan.images.len(),
            frames.len()
        )));
    }
    let (width, height) = plan.canvas_size();
    let mut canvas = RgbaFrame::transparent(width, height)?;
    let frame_of = |i: usize| {
        frames
            .get(i)
            .copied()
            .ok_or_else(|| StitchError::Other(anyhow::anyhow!("draw order names image {i}")))
    };

    match pool {
        Some(pool) => {
            let tiles = pool.install(|| {
                plan.draw_order
                    .par_iter()
                    .map(|&i| warp_into_rect(plan, i, frame_of(i)?, vision))
                    .collect::<StitchResult<Vec<_>>>()
            })?;
            for (&i, tile) in plan.draw_order.iter().zip(&tiles) {
                paste(&mut canvas, plan, i, tile)?;
            }
        }
        None => {
            for &i in &plan.draw_order {
                let tile = warp_into_rect(plan, i, frame_of(i)?, vision)?;
                paste(&mut canvas, plan, i, &tile)?;
            }
        }
    }
    Ok(canvas)
}

fn paste(
    canvas: &mut RgbaFrame,
    plan: &StitchPlan,
    index: usize,
    tile: &RgbaFrame,
) -> StitchResult<()> {
    let (x, y) = plan.canvas_offset(index).ok_or_else(|| {
        StitchError::Other(anyhow::anyhow!("plan has no placement for image {index}"))
    })?;
    tracing::info!(image = %plan.images[index].name, x, y, "paste");
    paste_over(canvas, tile, x, y)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
