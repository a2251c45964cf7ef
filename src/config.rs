use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{StitchError, StitchResult};

/// Tunables shared by matching and graph construction.
///
/// Only the two documented keys are accepted; any other key is a
/// [`StitchError::Configuration`] error.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StitcherConfig {
    /// Lowe ratio: a candidate is kept when `best < ratio_threshold * second_best`.
    #[serde(default = "default_ratio_threshold", alias = "ratioThreshold")]
    pub ratio_threshold: f32,
    /// Minimum accepted correspondences for a pair to become a graph edge.
    #[serde(default = "default_matches_threshold", alias = "matchesThreshold")]
    pub matches_threshold: usize,
}

fn default_ratio_threshold() -> f32 {
    0.7
}

fn default_matches_threshold() -> usize {
    10
}

/// Fewest correspondences a homography can be estimated from.
pub const MIN_HOMOGRAPHY_CORRESPONDENCES: usize = 4;

impl Default for StitcherConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: default_ratio_threshold(),
            matches_threshold: default_matches_threshold(),
        }
    }
}

impl StitcherConfig {
    /// Parse a JSON object, rejecting unknown keys, and validate it.
    pub fn from_json_str(s: &str) -> StitchResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| StitchError::configuration(format!("parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: &Path) -> StitchResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Check value ranges.
    pub fn validate(&self) -> StitchResult<()> {
        if !self.ratio_threshold.is_finite()
            || self.ratio_threshold <= 0.0
            || self.ratio_threshold > 1.0
        {
            return Err(StitchError::configuration(format!(
                "ratio_threshold must be in (0, 1], got {}",
                self.ratio_threshold
            )));
        }
        if self.matches_threshold < MIN_HOMOGRAPHY_CORRESPONDENCES {
            return Err(StitchError::configuration(format!(
                "matches_threshold must be >= {MIN_HOMOGRAPHY_CORRESPONDENCES}, got {}",
                self.matches_threshold
            )));
        }
        Ok(())
    }
}

/// Worker-thread controls for the per-image stages (matching, warping).
#[derive(Clone, Debug, Default)]
pub struct StitchThreading {
    /// Run per-image stages on a rayon pool when `true`. Otherwise everything runs on the
    /// calling thread.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl StitchThreading {
    pub(crate) fn build_pool(&self) -> StitchResult<Option<rayon::ThreadPool>> {
        if !self.parallel {
            return Ok(None);
        }
        if let Some(n) = self.threads
            && n == 0
        {
            return Err(StitchError::configuration(
                "threading 'threads' must be >= 1 when set",
            ));
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.threads {
            builder = builder.num_threads(n);
        }
        builder.build().map(Some).map_err(|e| {
            StitchError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}"))
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
