use crate::foundation::error::{StitchError, StitchResult};
use crate::graph::match_graph::MatchGraph;

/// Largest shortest-path distance from each node; `None` if some node is unreachable.
pub fn eccentricities(graph: &MatchGraph) -> Vec<Option<u64>> {
    graph
        .all_pairs_shortest_paths()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .try_fold(0u64, |acc, d| d.map(|d| acc.max(d)))
        })
        .collect()
}

/// Graph center: minimum eccentricity, lowest index on ties.
///
/// Unreachable pairs count as infinitely far, so on a disconnected graph every node ties
/// and index 0 wins; callers validate connectivity first.
pub fn select_center(graph: &MatchGraph) -> StitchResult<usize> {
    if graph.node_count() == 0 {
        return Err(StitchError::EmptySession);
    }
    let ecc = eccentricities(graph);
    tracing::debug!(?ecc, "eccentricities");
    let center = ecc
        .iter()
        .enumerate()
        .min_by_key(|(i, e)| (e.unwrap_or(u64::MAX), *i))
        .map(|(i, _)| i)
        .ok_or(StitchError::EmptySession)?;
    Ok(center)
}

#[cfg(test)]
#[path = "../../tests/unit/graph/center.rs"]
mod tests;
