use std::path::Path;

use rayon::prelude::*;

use crate::compose::homography::{compose_homographies, pairwise_transforms};
use crate::compose::planner::{StitchPlan, plan_layout};
use crate::config::{StitchThreading, StitcherConfig};
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::{StitchError, StitchResult};
use crate::graph::center::select_center;
use crate::graph::match_graph::MatchGraph;
use crate::matches::store::{
    Correspondence, CorrespondenceStore, MatchRecord, PairKey, ratio_filter,
};
use crate::render::compositor::composite;
use crate::vision::{Features, Keypoint, NativeVision, VisionPrimitives};

struct StitchImage {
    name: String,
    frame: RgbaFrame,
    features: Features,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CenterState {
    Unknown,
    Computed { index: usize, node_count: usize },
    Manual(usize),
}

/// A stitching session: images are added one at a time, then stitched into one canvas.
///
/// Each added image is matched against every image already in the session. Pairs that pass
/// the ratio test with at least `matches_threshold` correspondences become edges of the
/// match graph. [`Stitcher::stitch`] picks the graph center as reference frame, chains
/// pairwise homographies along shortest paths to it and paints the warped images far to near.
pub struct Stitcher {
    config: StitcherConfig,
    vision: Box<dyn VisionPrimitives>,
    pool: Option<rayon::ThreadPool>,
    images: Vec<StitchImage>,
    store: CorrespondenceStore,
    graph: Option<MatchGraph>,
    center: CenterState,
    next_auto_name: usize,
}

impl std::fmt::Debug for Stitcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stitcher")
            .field("config", &self.config)
            .field("images", &self.image_names())
            .field("pairs", &self.store.len())
            .field("center", &self.center)
            .finish_non_exhaustive()
    }
}

impl Stitcher {
    /// Session using the built-in [`NativeVision`] backend.
    pub fn new(config: StitcherConfig) -> StitchResult<Self> {
        Self::with_vision(config, NativeVision::default())
    }

    /// Session using a caller-provided vision backend.
    pub fn with_vision(
        config: StitcherConfig,
        vision: impl VisionPrimitives + 'static,
    ) -> StitchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            vision: Box::new(vision),
            pool: None,
            images: Vec::new(),
            store: CorrespondenceStore::new(),
            graph: None,
            center: CenterState::Unknown,
            next_auto_name: 1,
        })
    }

    /// Run matching and warping on a dedicated rayon pool.
    pub fn with_threading(mut self, threading: StitchThreading) -> StitchResult<Self> {
        self.pool = threading.build_pool()?;
        Ok(self)
    }

    /// Active configuration.
    pub fn config(&self) -> &StitcherConfig {
        &self.config
    }

    /// Number of images in the session.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether no image has been added.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Image names in insertion order.
    pub fn image_names(&self) -> Vec<&str> {
        self.images.iter().map(|img| img.name.as_str()).collect()
    }

    /// Accepted correspondence count between images `a` and `b`, if the pair is an edge.
    pub fn match_count(&self, a: usize, b: usize) -> Option<usize> {
        self.store.get(a, b).map(MatchRecord::count)
    }

    /// Add a decoded image. Returns its index.
    ///
    /// Without a name the image is called `01`, `02`, ... in insertion order.
    #[tracing::instrument(skip(self, image))]
    pub fn add_image(
        &mut self,
        image: &image::DynamicImage,
        name: Option<&str>,
    ) -> StitchResult<usize> {
        let name = self.resolve_name(name)?;
        let frame = RgbaFrame::from_dynamic(image)?;
        self.insert(name, frame)
    }

    /// Add a straight-alpha RGBA8 buffer of `width * height * 4` bytes. Returns its index.
    pub fn add_raw_rgba8(
        &mut self,
        width: u32,
        height: u32,
        data: Vec<u8>,
        name: Option<&str>,
    ) -> StitchResult<usize> {
        let name = self.resolve_name(name)?;
        if width == 0 || height == 0 {
            return Err(StitchError::image("image has zero width or height"));
        }
        let frame = RgbaFrame::from_straight_rgba8(width, height, data)?;
        self.insert(name, frame)
    }

    /// Decode and add an image file; the name defaults to the file stem.
    pub fn add_image_path(&mut self, path: &Path, name: Option<&str>) -> StitchResult<usize> {
        let stem = path.file_stem().and_then(|s| s.to_str());
        let name = self.resolve_name(name.or(stem))?;
        let frame = RgbaFrame::open(path)?;
        self.insert(name, frame)
    }

    /// Reference image index, computed on first use after the image set changes.
    ///
    /// Fails with [`StitchError::Connectivity`] when the match graph is disconnected.
    pub fn center(&mut self) -> StitchResult<usize> {
        let n = self.images.len();
        match self.center {
            CenterState::Manual(index) => return Ok(index),
            CenterState::Computed { index, node_count } if node_count == n => return Ok(index),
            _ => {}
        }
        self.refresh_graph()?;
        let center = select_center(self.connected_graph()?)?;
        tracing::info!(center = %self.images[center].name, "selected center image");
        self.center = CenterState::Computed {
            index: center,
            node_count: n,
        };
        Ok(center)
    }

    /// Pin the reference image; it stays pinned as more images are added.
    pub fn set_center(&mut self, index: usize) -> StitchResult<()> {
        if index >= self.images.len() {
            return Err(StitchError::configuration(format!(
                "center index {index} is out of range for {} images",
                self.images.len()
            )));
        }
        self.center = CenterState::Manual(index);
        Ok(())
    }

    /// Pin the reference image by name.
    pub fn set_center_by_name(&mut self, name: &str) -> StitchResult<()> {
        let index = self
            .images
            .iter()
            .position(|img| img.name == name)
            .ok_or_else(|| StitchError::configuration(format!("no image named '{name}'")))?;
        self.set_center(index)
    }

    /// Validate the graph, pick the center and lay out every image.
    pub fn plan(&mut self) -> StitchResult<StitchPlan> {
        self.refresh_graph()?;
        let center = self.center()?;
        let graph = self.connected_graph()?;
        let tree = graph.shortest_path_tree(center)?;
        tracing::debug!(parents = ?tree.parents(), "shortest path tree");

        let names = self.owned_names();
        let keypoints: Vec<&[Keypoint]> = self
            .images
            .iter()
            .map(|img| img.features.keypoints.as_slice())
            .collect();
        let local = pairwise_transforms(&tree, &self.store, &keypoints, &names, &*self.vision)?;
        let transforms = compose_homographies(&tree, &local)?;

        let frames = self.frames();
        plan_layout(&tree, &transforms, &frames, &names, &*self.vision)
    }

    /// Stitch every image into one premultiplied RGBA8 canvas.
    #[tracing::instrument(skip(self))]
    pub fn stitch(&mut self) -> StitchResult<RgbaFrame> {
        let plan = self.plan()?;
        let frames = self.frames();
        composite(&plan, &frames, &*self.vision, self.pool.as_ref())
    }

    fn frames(&self) -> Vec<&RgbaFrame> {
        self.images.iter().map(|img| &img.frame).collect()
    }

    fn owned_names(&self) -> Vec<String> {
        self.images.iter().map(|img| img.name.clone()).collect()
    }

    fn resolve_name(&mut self, name: Option<&str>) -> StitchResult<String> {
        if let Some(name) = name {
            if name.is_empty() {
                return Err(StitchError::image("image name must not be empty"));
            }
            if self.images.iter().any(|img| img.name == name) {
                return Err(StitchError::image(format!(
                    "image name '{name}' is already taken"
                )));
            }
            return Ok(name.to_string());
        }
        loop {
            let candidate = format!("{:02}", self.next_auto_name);
            self.next_auto_name += 1;
            if !self.images.iter().any(|img| img.name == candidate) {
                return Ok(candidate);
            }
        }
    }

    fn insert(&mut self, name: String, frame: RgbaFrame) -> StitchResult<usize> {
        let features = self.vision.detect_features(&frame)?;
        tracing::debug!(
            image = %name,
            keypoints = features.keypoints.len(),
            "detected features"
        );

        let records = self.match_against_existing(&name, &features);
        let index = self.images.len();
        for (train, record) in records {
            let key = PairKey::new(train, index).ok_or_else(|| {
                StitchError::Other(anyhow::anyhow!("image {index} matched against itself"))
            })?;
            self.store.insert(key, record)?;
        }

        self.images.push(StitchImage {
            name,
            frame,
            features,
        });
        self.graph = None;
        Ok(index)
    }

    // New image is the query side, existing images are the train side.
    fn match_against_existing(
        &self,
        name: &str,
        features: &Features,
    ) -> Vec<(usize, MatchRecord)> {
        let match_one = |(train, existing): (usize, &StitchImage)| {
            let candidates = self
                .vision
                .match_descriptors(&features.descriptors, &existing.features.descriptors);
            let accepted = ratio_filter(&candidates, self.config.ratio_threshold);
            if accepted.len() < self.config.matches_threshold {
                tracing::debug!(
                    query = %name,
                    train = %existing.name,
                    matches = accepted.len(),
                    "pair rejected"
                );
                return None;
            }
            tracing::info!(
                query = %name,
                train = %existing.name,
                matches = accepted.len(),
                "pair accepted"
            );
            let correspondences = accepted
                .iter()
                .map(|c| Correspondence {
                    lo: c.train,
                    hi: c.query,
                    distance: c.distance,
                })
                .collect();
            Some((train, MatchRecord { correspondences }))
        };

        match &self.pool {
            Some(pool) => pool.install(|| {
                self.images
                    .par_iter()
                    .enumerate()
                    .filter_map(match_one)
                    .collect()
            }),
            None => self
                .images
                .iter()
                .enumerate()
                .filter_map(match_one)
                .collect(),
        }
    }

    fn refresh_graph(&mut self) -> StitchResult<()> {
        let n = self.images.len();
        if self.graph.as_ref().is_some_and(|g| g.node_count() == n) {
            return Ok(());
        }
        self.graph = None;
        let graph = MatchGraph::from_store(&self.store, n)?;
        for (key, record) in self.store.iter() {
            tracing::debug!(
                a = key.lo,
                b = key.hi,
                matches = record.count(),
                weight = ?graph.edge_weight(key.lo, key.hi),
                "graph edge"
            );
        }
        self.graph = Some(graph);
        Ok(())
    }

    fn connected_graph(&self) -> StitchResult<&MatchGraph> {
        let graph = self.graph.as_ref().ok_or(StitchError::EmptySession)?;
        graph.validate_connected(&self.owned_names())?;
        Ok(graph)
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
