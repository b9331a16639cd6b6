mod cluster;
mod community;
mod dot;
mod model;
mod parse;
mod traversal;

pub use cluster::{
    ClusterEdge, ClusterGraph, ClusterNode, build_cluster_graph, cluster_id, cluster_payload,
};
pub use community::{CommunityId, CommunityMap, detect_communities};
pub use dot::parse_dot;
pub use model::{Edge, GraphPayload, Node, NodeKind, find_roots};
pub use parse::{PayloadFormat, load_payload, parse_payload};
pub use traversal::{
    DepthLimit, TreeNode, build_tree, ego_tree, expand_node, tree_links, tree_payload,
};
