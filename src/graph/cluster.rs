use super::community::{CommunityId, CommunityMap, detect_communities};
use super::model::{Edge, GraphPayload};

pub fn cluster_id(community: CommunityId) -> String {
    format!("cluster-{community}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterNode {
    pub id: String,
    pub community: CommunityId,
    pub member_ids: Vec<String>,
    pub size: usize,
}

/// Edge between two cluster nodes, one per crossing edge of the base graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterEdge {
    pub source: String,
    pub target: String,
}

/// Base graph and its cluster overlay, exposed side by side.
#[derive(Clone, Debug, Default)]
pub struct ClusterGraph {
    pub base: GraphPayload,
    pub communities: CommunityMap,
    pub clusters: Vec<ClusterNode>,
    pub cluster_edges: Vec<ClusterEdge>,
}

impl ClusterGraph {
    /// `member -> cluster-<c>` pairs tying every base node to its cluster node.
    pub fn membership_links(&self) -> Vec<Edge> {
        self.clusters
            .iter()
            .flat_map(|cluster| {
                cluster
                    .member_ids
                    .iter()
                    .map(|member| Edge::new(member.clone(), cluster.id.clone()))
            })
            .collect()
    }

    pub fn cluster_of(&self, id: &str) -> Option<&ClusterNode> {
        let community = self.communities.community_of(id)?;
        self.clusters.get(community)
    }
}

/// Collapses communities into cluster nodes and counts crossing edges.
///
/// Parallel crossing edges are kept, so the number of cluster edges between two
/// clusters equals the number of base edges between their members.
pub fn build_cluster_graph(payload: &GraphPayload, communities: CommunityMap) -> ClusterGraph {
    let clusters = communities
        .members(&payload.nodes)
        .into_iter()
        .enumerate()
        .map(|(community, member_ids)| ClusterNode {
            id: cluster_id(community),
            community,
            size: member_ids.len(),
            member_ids,
        })
        .collect::<Vec<_>>();

    let cluster_edges = payload
        .links
        .iter()
        .filter_map(|link| {
            let source = communities.community_of(&link.source)?;
            let target = communities.community_of(&link.target)?;
            (source != target).then(|| ClusterEdge {
                source: cluster_id(source),
                target: cluster_id(target),
            })
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        clusters = clusters.len(),
        cluster_edges = cluster_edges.len(),
        "built cluster graph"
    );
    ClusterGraph {
        base: payload.clone(),
        communities,
        clusters,
        cluster_edges,
    }
}

/// Detects communities over the whole payload and builds the overlay.
pub fn cluster_payload(payload: &GraphPayload) -> ClusterGraph {
    let communities = detect_communities(&payload.nodes, &payload.links);
    build_cluster_graph(payload, communities)
}
