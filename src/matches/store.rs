use std::collections::BTreeMap;

use crate::foundation::error::{StitchError, StitchResult};
use crate::vision::{CandidateMatch, Keypoint, PointPair};

/// Unordered image pair, stored lower index first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PairKey {
    /// Smaller image index.
    pub lo: usize,
    /// Larger image index.
    pub hi: usize,
}

impl PairKey {
    /// Canonical key for `{a, b}`; `None` when `a == b`.
    pub fn new(a: usize, b: usize) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { lo: a, hi: b }),
            std::cmp::Ordering::Greater => Some(Self { lo: b, hi: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// One accepted correspondence, as keypoint indices oriented `lo -> hi`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    /// Keypoint index in the `lo` image.
    pub lo: usize,
    /// Keypoint index in the `hi` image.
    pub hi: usize,
    /// Descriptor distance of the accepted candidate.
    pub distance: f32,
}

/// Accepted correspondences for one image pair, in matcher order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchRecord {
    /// Ordered correspondence list.
    pub correspondences: Vec<Correspondence>,
}

impl MatchRecord {
    /// Number of accepted correspondences.
    pub fn count(&self) -> usize {
        self.correspondences.len()
    }
}

/// Lowe ratio test: keep the best candidate when it is clearly better than the runner-up.
///
/// Queries with fewer than two candidates are dropped.
pub fn ratio_filter(candidates: &[Vec<CandidateMatch>], ratio: f32) -> Vec<CandidateMatch> {
    candidates
        .iter()
        .filter_map(|c| match c.as_slice() {
            [first, second, ..] if first.distance < ratio * second.distance => Some(*first),
            _ => None,
        })
        .collect()
}

/// Pairwise match records keyed by canonical [`PairKey`].
///
/// A pair is present only if it passed the correspondence-count threshold.
#[derive(Clone, Debug, Default)]
pub struct CorrespondenceStore {
    records: BTreeMap<PairKey, MatchRecord>,
}

impl CorrespondenceStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the matches for `key`. Each pair may be written once.
    pub fn insert(&mut self, key: PairKey, record: MatchRecord) -> StitchResult<()> {
        if self.records.contains_key(&key) {
            return Err(StitchError::Other(anyhow::anyhow!(
                "pair ({}, {}) already has a match record",
                key.lo,
                key.hi
            )));
        }
        self.records.insert(key, record);
        Ok(())
    }

    /// Record for `{a, b}` regardless of argument order.
    pub fn get(&self, a: usize, b: usize) -> Option<&MatchRecord> {
        PairKey::new(a, b).and_then(|k| self.records.get(&k))
    }

    /// All records in key order.
    pub fn iter(&self) -> impl Iterator<Item = (PairKey, &MatchRecord)> {
        self.records.iter().map(|(k, v)| (*k, v))
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no pair has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Largest correspondence count over all pairs, `0` when empty.
    pub fn max_count(&self) -> usize {
        self.records.values().map(MatchRecord::count).max().unwrap_or(0)
    }

    /// Point pairs mapping image `src` onto image `dst`.
    ///
    /// Records are stored `lo -> hi`; when `src` is the `hi` side the roles are swapped so the
    /// result always reads `src -> dst`.
    pub fn oriented_pairs(
        &self,
        src: usize,
        dst: usize,
        src_keypoints: &[Keypoint],
        dst_keypoints: &[Keypoint],
    ) -> StitchResult<Vec<PointPair>> {
        let record = self.get(src, dst).ok_or_else(|| {
            StitchError::estimation(format!("no match record between images {src} and {dst}"))
        })?;
        let swap = src > dst;
        record
            .correspondences
            .iter()
            .map(|c| {
                let (si, di) = if swap { (c.hi, c.lo) } else { (c.lo, c.hi) };
                match (src_keypoints.get(si), dst_keypoints.get(di)) {
                    (Some(s), Some(d)) => Ok(PointPair {
                        src: s.pos,
                        dst: d.pos,
                    }),
                    _ => Err(StitchError::estimation(format!(
                        "correspondence ({si}, {di}) references a missing keypoint"
                    ))),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/matches/store.rs"]
mod tests;
