use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer};

use crate::error::{GraphError, Result};

/// Node category inferred from the store path suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Derivation,
    Patch,
    Script,
    Other,
}

impl NodeKind {
    pub fn from_id(id: &str) -> Self {
        if id.ends_with(".drv") {
            Self::Derivation
        } else if id.ends_with(".patch") {
            Self::Patch
        } else if id.ends_with(".sh") {
            Self::Script
        } else {
            Self::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Derivation => "Derivation (.drv)",
            Self::Patch => "Patch (.patch)",
            Self::Script => "Shell (.sh)",
            Self::Other => "Other",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "RawNode")]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let kind = NodeKind::from_id(&id);
        Self { id, kind }
    }
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        Self::new(raw.id)
    }
}

/// Directed edge: `source` depends on `target`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Edge {
    #[serde(deserialize_with = "endpoint_id")]
    pub source: String,
    #[serde(deserialize_with = "endpoint_id")]
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Id(String),
    Node { id: String },
}

fn endpoint_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match EndpointRepr::deserialize(deserializer)? {
        EndpointRepr::Id(id) | EndpointRepr::Node { id } => id,
    })
}

/// The unit exchanged with the data source: a flat node list plus edge list.
///
/// Edges may reference ids missing from `nodes`; parallel edges and
/// self-loops are kept as given.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GraphPayload {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Edge>,
}

impl GraphPayload {
    pub fn new(nodes: Vec<Node>, links: Vec<Edge>) -> Self {
        Self { nodes, links }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|node| node.id.as_str()).collect()
    }

    /// Outgoing neighbors per node in link order; dangling targets are dropped.
    pub(crate) fn outgoing(&self) -> HashMap<&str, Vec<&str>> {
        let known = self.node_ids();
        let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::with_capacity(known.len());
        for link in &self.links {
            if known.contains(link.source.as_str()) && known.contains(link.target.as_str()) {
                outgoing
                    .entry(link.source.as_str())
                    .or_default()
                    .push(link.target.as_str());
            }
        }
        outgoing
    }

    /// First node without incoming edges, or the first node of a fully cyclic graph.
    pub fn entry_point(&self) -> Result<&Node> {
        if let Some(root) = find_roots(&self.nodes, &self.links).into_iter().next() {
            return Ok(root);
        }

        let fallback = self.nodes.first().ok_or(GraphError::NoRootFound)?;
        tracing::warn!(
            node = %fallback.id,
            "graph has no node without incoming edges, using first node as entry point"
        );
        Ok(fallback)
    }
}

/// Nodes with in-degree 0 over the full directed edge set, in payload order.
pub fn find_roots<'a>(nodes: &'a [Node], links: &[Edge]) -> Vec<&'a Node> {
    let has_incoming = links
        .iter()
        .map(|link| link.target.as_str())
        .collect::<HashSet<_>>();
    nodes
        .iter()
        .filter(|node| !has_incoming.contains(node.id.as_str()))
        .collect()
}
