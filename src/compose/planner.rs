//! Canvas bounds and paint order from composed transforms.

use serde::Serialize;

use crate::foundation::core::{
    FittingRect, Homography, Point, RgbaFrame, display_name, fitting_rectangle,
};
use crate::foundation::error::{StitchError, StitchResult};
use crate::graph::tree::SpanningTree;
use crate::vision::VisionPrimitives;

/// Where one image lands on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImagePlacement {
    /// Image name.
    pub name: String,
    /// Transform into the center image's frame.
    #[serde(serialize_with = "serialize_rows")]
    pub transform: Homography,
    /// Projected corners, in `(0,0), (0,W), (H,W), (H,0)` (row, column) order.
    pub corners: [Point; 4],
    /// Fitting rectangle of `corners`, in center-frame coordinates.
    pub rect: FittingRect,
}

/// Everything needed to paint the panorama: layout, transforms and draw order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StitchPlan {
    /// Index of the reference image.
    pub center: usize,
    /// Shortest-path tree parent of each image; `None` for the center.
    pub parents: Vec<Option<usize>>,
    /// One placement per image, by insertion index.
    pub images: Vec<ImagePlacement>,
    /// Union of every placement rectangle; the canvas covers exactly this area.
    pub bounds: FittingRect,
    /// Paint order, farthest from the center first and the center last.
    pub draw_order: Vec<usize>,
}

impl StitchPlan {
    /// Canvas size in pixels.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.bounds.width, self.bounds.height)
    }

    /// Placement of `index` relative to the canvas origin.
    pub fn canvas_offset(&self, index: usize) -> Option<(i64, i64)> {
        self.images.get(index).map(|p| {
            (
                p.rect.left - self.bounds.left,
                p.rect.top - self.bounds.top,
            )
        })
    }
}

/// Project every image's corners, fit the local and global rectangles and derive the draw
/// order.
pub(crate) fn plan_layout(
    tree: &SpanningTree,
    transforms: &[Homography],
    frames: &[&RgbaFrame],
    names: &[String],
    vision: &dyn VisionPrimitives,
) -> StitchResult<StitchPlan> {
    if transforms.len() != frames.len() || tree.len() != frames.len() {
        return Err(StitchError::Other(anyhow::anyhow!(
            "plan inputs disagree: {} transforms, {} frames, {} tree nodes",
            transforms.len(),
            frames.len(),
            tree.len()
        )));
    }

    let mut images = Vec::with_capacity(frames.len());
    for (i, (frame, h)) in frames.iter().zip(transforms).enumerate() {
        let name = display_name(names, i);
        let projected = vision
            .transform_points(&frame.corners(), h)
            .unwrap_or_default();
        let corners: [Point; 4] = projected.try_into().map_err(|got: Vec<Point>| {
            StitchError::geometry(format!(
                "image '{name}' projected to {} corners instead of 4",
                got.len()
            ))
        })?;
        let rect = fitting_rectangle(&corners).ok_or_else(|| {
            StitchError::geometry(format!("image '{name}' has non-finite projected corners"))
        })?;
        images.push(ImagePlacement {
            name,
            transform: *h,
            corners,
            rect,
        });
    }

    let bounds = fitting_rectangle(images.iter().flat_map(|p| p.corners.iter()))
        .ok_or_else(|| StitchError::geometry("panorama bounds are not finite"))?;

    let draw_order = tree.draw_order();
    if draw_order.len() != frames.len() {
        return Err(StitchError::Other(anyhow::anyhow!(
            "draw order covers {} of {} images",
            draw_order.len(),
            frames.len()
        )));
    }

    tracing::info!(
        width = bounds.width,
        height = bounds.height,
        left = bounds.left,
        top = bounds.top,
        "panorama bounds"
    );
    tracing::info!(?draw_order, "draw order");

    Ok(StitchPlan {
        center: tree.root(),
        parents: tree.parents().to_vec(),
        images,
        bounds,
        draw_order,
    })
}

fn serialize_rows<S: serde::Serializer>(h: &Homography, s: S) -> Result<S::Ok, S::Error> {
    let rows: [[f64; 3]; 3] = std::array::from_fn(|r| std::array::from_fn(|c| h[(r, c)]));
    rows.serialize(s)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/planner.rs"]
mod tests;
