use std::collections::HashMap;

use super::model::{Edge, Node};

pub type CommunityId = usize;

/// Connected-component labels over the undirected closure of the edge set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommunityMap {
    by_node: HashMap<String, CommunityId>,
    count: usize,
}

impl CommunityMap {
    pub fn community_of(&self, id: &str) -> Option<CommunityId> {
        self.by_node.get(id).copied()
    }

    /// Number of distinct communities; ids run from 0 to `count() - 1`.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CommunityId)> {
        self.by_node.iter().map(|(id, community)| (id.as_str(), *community))
    }

    /// Member ids per community, each list in node order.
    pub fn members(&self, nodes: &[Node]) -> Vec<Vec<String>> {
        let mut members = vec![Vec::new(); self.count];
        for node in nodes {
            if let Some(community) = self.community_of(&node.id) {
                members[community].push(node.id.clone());
            }
        }
        members
    }
}

/// Labels every node with a connected-component id.
///
/// Components are discovered in node order, so the first node is always in
/// community 0. Edge direction is ignored and edges touching unknown ids are
/// skipped. Uses an explicit stack, so graph size does not bound call depth.
pub fn detect_communities(nodes: &[Node], links: &[Edge]) -> CommunityMap {
    let index_by_id = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect::<HashMap<_, _>>();

    let mut neighbors = vec![Vec::new(); nodes.len()];
    for link in links {
        if let (Some(&source), Some(&target)) = (
            index_by_id.get(link.source.as_str()),
            index_by_id.get(link.target.as_str()),
        ) {
            neighbors[source].push(target);
            neighbors[target].push(source);
        }
    }

    let mut labels: Vec<Option<CommunityId>> = vec![None; nodes.len()];
    let mut next_id = 0;
    let mut stack = Vec::new();

    for start in 0..nodes.len() {
        if labels[start].is_some() {
            continue;
        }

        labels[start] = Some(next_id);
        stack.push(start);
        while let Some(current) = stack.pop() {
            for &next in &neighbors[current] {
                if labels[next].is_none() {
                    labels[next] = Some(next_id);
                    stack.push(next);
                }
            }
        }
        next_id += 1;
    }

    let by_node = nodes
        .iter()
        .zip(labels)
        .filter_map(|(node, label)| label.map(|community| (node.id.clone(), community)))
        .collect::<HashMap<_, _>>();

    tracing::debug!(nodes = nodes.len(), communities = next_id, "detected communities");
    CommunityMap {
        by_node,
        count: next_id,
    }
}
