pub(crate) mod center;
pub(crate) mod match_graph;
pub(crate) mod tree;
