//! Per-edge homography estimation and composition into the center's frame.

use crate::foundation::core::{Homography, display_name};
use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::{is_finite_homography, normalize_homography};
use crate::graph::tree::SpanningTree;
use crate::matches::store::CorrespondenceStore;
use crate::vision::{Keypoint, VisionPrimitives};

/// Estimate, for every non-root node, the transform mapping it onto its tree parent.
///
/// The root and nodes without a parent get the identity. `keypoints[i]` are the keypoints
/// of image `i`; `names` only feeds error messages.
pub(crate) fn pairwise_transforms(
    tree: &SpanningTree,
    store: &CorrespondenceStore,
    keypoints: &[&[Keypoint]],
    names: &[String],
    vision: &dyn VisionPrimitives,
) -> StitchResult<Vec<Homography>> {
    let mut local = vec![Homography::identity(); tree.len()];
    for (node, slot) in local.iter_mut().enumerate() {
        let Some(parent) = tree.parent(node) else {
            continue;
        };
        let (Some(src), Some(dst)) = (keypoints.get(node), keypoints.get(parent)) else {
            return Err(StitchError::estimation(format!(
                "no keypoints for tree edge {node} -> {parent}"
            )));
        };
        let pairs = store.oriented_pairs(node, parent, src, dst)?;
        let estimate = vision.estimate_homography(&pairs)?;
        if estimate.inliers == 0 {
            return Err(StitchError::estimation(format!(
                "homography from '{}' to '{}' has no inliers ({} correspondences)",
                display_name(names, node),
                display_name(names, parent),
                pairs.len()
            )));
        }
        tracing::debug!(
            node,
            parent,
            inliers = estimate.inliers,
            total = pairs.len(),
            "pairwise homography"
        );
        *slot = estimate.matrix;
    }
    Ok(local)
}

/// Compose local transforms along the tree so each entry maps its image into the root's
/// frame. The root's entry is exactly the identity.
///
/// With column vectors the chain reads `composed[node] = composed[parent] * local[node]`:
/// the local step is applied first.
pub(crate) fn compose_homographies(
    tree: &SpanningTree,
    local: &[Homography],
) -> StitchResult<Vec<Homography>> {
    let n = tree.len();
    if local.len() != n {
        return Err(StitchError::Other(anyhow::anyhow!(
            "expected {n} local transforms, got {}",
            local.len()
        )));
    }

    let mut composed: Vec<Option<Homography>> = vec![None; n];
    composed[tree.root()] = Some(Homography::identity());

    let mut stack = Vec::new();
    for start in 0..n {
        if composed[start].is_some() {
            continue;
        }
        stack.push(start);
        while let Some(&node) = stack.last() {
            let parent = tree.parent(node).ok_or_else(|| {
                StitchError::estimation(format!("image {node} is not attached to the tree root"))
            })?;
            match composed[parent] {
                Some(parent_h) => {
                    let h = normalize_homography(parent_h * local[node]);
                    if !is_finite_homography(&h) {
                        return Err(StitchError::estimation(format!(
                            "composed transform of image {node} is not finite"
                        )));
                    }
                    composed[node] = Some(h);
                    stack.pop();
                }
                None => {
                    // A chain longer than the node count means the parent map loops.
                    if stack.len() > n {
                        return Err(StitchError::Other(anyhow::anyhow!(
                            "parent map contains a cycle through image {node}"
                        )));
                    }
                    stack.push(parent);
                }
            }
        }
    }

    let out: Vec<Homography> = composed.into_iter().flatten().collect();
    for (i, h) in out.iter().enumerate() {
        tracing::debug!(image = i, transform = ?h, "composed homography");
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/homography.rs"]
mod tests;
