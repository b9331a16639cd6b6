use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use super::model::{Edge, GraphPayload, Node};

/// Maximum hop count followed from the root of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthLimit {
    Bounded(usize),
    Unbounded,
}

impl DepthLimit {
    pub fn allows(self, depth: usize) -> bool {
        match self {
            Self::Bounded(max) => depth <= max,
            Self::Unbounded => true,
        }
    }
}

impl Default for DepthLimit {
    fn default() -> Self {
        Self::Bounded(3)
    }
}

impl fmt::Display for DepthLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(max) => write!(f, "{max}"),
            Self::Unbounded => f.write_str("inf"),
        }
    }
}

impl FromStr for DepthLimit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inf" | "infinity" | "unbounded" => Ok(Self::Unbounded),
            other => other
                .parse::<usize>()
                .map(Self::Bounded)
                .map_err(|_| format!("expected a depth or `inf`, got {value:?}")),
        }
    }
}

/// One entry of a rooted tree extracted from the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub depth: usize,
}

/// Depth-first tree extraction from `root` (or the payload's entry point).
///
/// Each node appears once with its first-discovered parent; later paths to an
/// already visited node are dropped, which also bounds cycles. Targets absent
/// from the node list are skipped. The output is in depth-first preorder and
/// depends only on node and link order.
pub fn build_tree(
    payload: &GraphPayload,
    root: Option<&str>,
    max_depth: DepthLimit,
) -> Vec<TreeNode> {
    let root = match root {
        Some(root) if payload.contains(root) => root,
        Some(root) => {
            tracing::warn!(root, "tree root is not part of the graph");
            return Vec::new();
        }
        None => match payload.entry_point() {
            Ok(node) => node.id.as_str(),
            Err(_) => return Vec::new(),
        },
    };

    let outgoing = payload.outgoing();
    let mut visited = HashSet::from([root]);
    let mut tree = Vec::new();
    let mut stack: Vec<(&str, Option<&str>, usize)> = vec![(root, None, 0)];

    while let Some((id, parent, depth)) = stack.pop() {
        if parent.is_some() && !visited.insert(id) {
            continue;
        }

        tree.push(TreeNode {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            depth,
        });

        if !max_depth.allows(depth + 1) {
            continue;
        }

        if let Some(targets) = outgoing.get(id) {
            for target in targets.iter().rev() {
                if !visited.contains(target) {
                    stack.push((*target, Some(id), depth + 1));
                }
            }
        }
    }

    tracing::debug!(root, depth = %max_depth, nodes = tree.len(), "built tree");
    tree
}

/// Parent-to-child edges of a tree, in tree order.
pub fn tree_links(tree: &[TreeNode]) -> Vec<Edge> {
    tree.iter()
        .filter_map(|node| {
            node.parent_id
                .as_ref()
                .map(|parent| Edge::new(parent.clone(), node.id.clone()))
        })
        .collect()
}

/// Visible node/link subset derived from a payload.
pub fn tree_payload(payload: &GraphPayload, tree: &[TreeNode]) -> GraphPayload {
    let by_id = payload
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect::<HashMap<_, _>>();
    let nodes = tree
        .iter()
        .filter_map(|entry| by_id.get(entry.id.as_str()).map(|node| (*node).clone()))
        .collect();
    GraphPayload::new(nodes, tree_links(tree))
}

/// Closed one-hop neighborhood of `node_id`, following edges in both directions.
///
/// Nodes keep payload order; links are every payload link with both endpoints
/// inside the neighborhood, including links between two neighbors.
pub fn expand_node(payload: &GraphPayload, node_id: &str) -> GraphPayload {
    let known = payload.node_ids();
    let mut related = HashSet::from([node_id]);
    for link in &payload.links {
        if link.source == node_id && known.contains(link.target.as_str()) {
            related.insert(link.target.as_str());
        }
        if link.target == node_id && known.contains(link.source.as_str()) {
            related.insert(link.source.as_str());
        }
    }

    let nodes = payload
        .nodes
        .iter()
        .filter(|node| related.contains(node.id.as_str()))
        .cloned()
        .collect::<Vec<Node>>();
    let links = payload
        .links
        .iter()
        .filter(|link| {
            related.contains(link.source.as_str()) && related.contains(link.target.as_str())
        })
        .cloned()
        .collect::<Vec<Edge>>();

    tracing::debug!(center = node_id, nodes = nodes.len(), links = links.len(), "expanded node");
    GraphPayload::new(nodes, links)
}

/// Two-rank tree for an ego network: the center at depth 0, neighbors below it.
pub fn ego_tree(ego: &GraphPayload, center: &str) -> Vec<TreeNode> {
    if !ego.contains(center) {
        return Vec::new();
    }

    let mut tree = vec![TreeNode {
        id: center.to_string(),
        parent_id: None,
        depth: 0,
    }];
    tree.extend(ego.nodes.iter().filter(|node| node.id != center).map(|node| TreeNode {
        id: node.id.clone(),
        parent_id: Some(center.to_string()),
        depth: 1,
    }));
    tree
}
