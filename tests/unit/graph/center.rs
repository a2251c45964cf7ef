use super::*;
use crate::matches::store::{Correspondence, CorrespondenceStore, MatchRecord, PairKey};

fn graph(n: usize, edges: &[(usize, usize, usize)]) -> MatchGraph {
    let mut store = CorrespondenceStore::new();
    for &(a, b, count) in edges {
        let record = MatchRecord {
            correspondences: vec![
                Correspondence {
                    lo: 0,
                    hi: 0,
                    distance: 0.0,
                };
                count
            ],
        };
        store.insert(PairKey::new(a, b).unwrap(), record).unwrap();
    }
    MatchGraph::from_store(&store, n).unwrap()
}

#[test]
fn middle_of_a_chain_is_the_center() {
    let g = graph(3, &[(0, 1, 20), (1, 2, 15)]);
    assert_eq!(eccentricities(&g), vec![Some(7), Some(6), Some(7)]);
    assert_eq!(select_center(&g).unwrap(), 1);
}

#[test]
fn strictly_smallest_eccentricity_wins_over_index() {
    // Chain 0-1-2-3-4 with uniform weights: node 2 is the unique center.
    let g = graph(5, &[(0, 1, 10), (1, 2, 10), (2, 3, 10), (3, 4, 10)]);
    assert_eq!(select_center(&g).unwrap(), 2);
}

#[test]
fn ties_go_to_the_lowest_index_and_repeat() {
    let g = graph(2, &[(0, 1, 10)]);
    assert_eq!(select_center(&g).unwrap(), 0);
    assert_eq!(select_center(&g).unwrap(), 0);
}

#[test]
fn single_image_is_its_own_center() {
    let g = graph(1, &[]);
    assert_eq!(eccentricities(&g), vec![Some(0)]);
    assert_eq!(select_center(&g).unwrap(), 0);
}

#[test]
fn disconnected_nodes_are_infinitely_eccentric() {
    let g = graph(3, &[(1, 2, 10)]);
    assert_eq!(eccentricities(&g), vec![None, None, None]);
    assert_eq!(select_center(&g).unwrap(), 0);
}
