//! User-facing state machine on top of the graph and layout engines.
//!
//! The controller owns the current payload, the navigation state and the
//! layout. Every navigation change re-derives the visible set from the payload
//! and restarts the layout; ticks tagged with an older payload version are
//! dropped.

mod viewport;

use std::fmt;

use eframe::egui::Vec2;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::config::{ClickAction, SimulationConfig, TreeLayoutConfig, ViewerConfig};
use crate::error::{GraphError, Result};
use crate::graph::{
    ClusterEdge, ClusterNode, CommunityMap, DepthLimit, Edge, GraphPayload, Node, TreeNode,
    build_cluster_graph, build_tree, detect_communities, ego_tree, expand_node, tree_payload,
};
use crate::layout::{LayoutEdge, LayoutEngine, LayoutNode, LinkKind, Phase, tree_layout};
use crate::util::display_name;
pub use viewport::{MAX_ZOOM, MIN_ZOOM, ViewTransform};

/// Which whole-payload view is shown when nothing is focused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FullView {
    #[default]
    Graph,
    /// Tree from the payload's entry point.
    Tree,
    /// Base graph with the community overlay.
    Clusters,
}

impl FullView {
    pub fn label(self) -> &'static str {
        match self {
            Self::Graph => "Graph",
            Self::Tree => "Tree",
            Self::Clusters => "Clusters",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Full(FullView),
    /// Tree rooted at the node.
    Focused(String),
    /// One-hop neighborhood of the node.
    Ego(String),
}

impl Default for Navigation {
    fn default() -> Self {
        Self::Full(FullView::default())
    }
}

/// Node and edge set currently on screen.
#[derive(Clone, Debug, Default)]
pub struct VisibleGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Edge>,
    /// Set for tree-shaped views, which use the rank layout.
    pub tree: Option<Vec<TreeNode>>,
    pub clusters: Vec<ClusterNode>,
    pub cluster_edges: Vec<ClusterEdge>,
    pub membership_links: Vec<Edge>,
}

impl VisibleGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.clusters.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
            || self.clusters.iter().any(|cluster| cluster.id == id)
    }

    fn plain(payload: GraphPayload) -> Self {
        Self {
            nodes: payload.nodes,
            links: payload.links,
            ..Self::default()
        }
    }

    fn tree(payload: GraphPayload, tree: Vec<TreeNode>) -> Self {
        Self {
            tree: Some(tree),
            ..Self::plain(payload)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub score: i64,
}

pub struct InteractionController {
    simulation: SimulationConfig,
    tree_layout: TreeLayoutConfig,
    click_action: ClickAction,
    depth: DepthLimit,
    payload: Option<GraphPayload>,
    communities: CommunityMap,
    version: u64,
    navigation: Navigation,
    visible: VisibleGraph,
    layout: LayoutEngine,
    transform: ViewTransform,
    matcher: SkimMatcherV2,
}

impl fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionController")
            .field("version", &self.version)
            .field("navigation", &self.navigation)
            .field("depth", &self.depth)
            .field("visible_nodes", &self.visible.nodes.len())
            .finish_non_exhaustive()
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(SimulationConfig::default(), TreeLayoutConfig::default())
    }
}

impl InteractionController {
    pub fn new(simulation: SimulationConfig, tree_layout: TreeLayoutConfig) -> Self {
        Self {
            simulation,
            tree_layout,
            click_action: ClickAction::default(),
            depth: DepthLimit::default(),
            payload: None,
            communities: CommunityMap::default(),
            version: 0,
            navigation: Navigation::default(),
            visible: VisibleGraph::default(),
            layout: LayoutEngine::new(simulation),
            transform: ViewTransform::default(),
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        let mut controller = Self::new(config.simulation, config.tree_layout);
        controller.click_action = config.click_action;
        controller.depth = config.depth;
        controller
    }

    /// Replaces the payload wholesale and starts a fresh layout.
    ///
    /// Returns the new version; ticks carrying an older version are ignored.
    pub fn load_payload(&mut self, payload: GraphPayload) -> u64 {
        self.version += 1;
        self.communities = detect_communities(&payload.nodes, &payload.links);
        tracing::info!(
            version = self.version,
            nodes = payload.node_count(),
            links = payload.edge_count(),
            communities = self.communities.count(),
            "loaded graph payload"
        );

        self.payload = Some(payload);
        self.navigation = Navigation::default();
        self.rederive(false);
        self.version
    }

    /// Records a failed fetch; whatever is on screen stays as it is.
    pub fn fetch_failed(&self, error: &dyn fmt::Display) {
        tracing::warn!(
            version = self.version,
            error = %error,
            "graph fetch failed, keeping current view"
        );
    }

    /// Applies the configured click action to `id`.
    pub fn click(&mut self, id: &str) -> Result<()> {
        if self.cluster_node(id).is_some() {
            // Cluster nodes are synthetic; there is nothing to focus.
            return Ok(());
        }

        match self.click_action {
            ClickAction::Expand => self.expand(id),
            ClickAction::Focus => self.focus(id),
        }
    }

    /// Shows the tree rooted at `id` within the current depth.
    pub fn focus(&mut self, id: &str) -> Result<()> {
        self.ensure_known(id)?;
        self.navigation = Navigation::Focused(id.to_string());
        self.rederive(true);
        Ok(())
    }

    /// Shows `id` together with its direct neighbors.
    pub fn expand(&mut self, id: &str) -> Result<()> {
        self.ensure_known(id)?;
        self.navigation = Navigation::Ego(id.to_string());
        self.rederive(true);
        Ok(())
    }

    /// Changes the tree depth; the focused node stays the same.
    pub fn set_depth(&mut self, depth: DepthLimit) {
        if self.depth == depth {
            return;
        }

        self.depth = depth;
        let uses_depth = matches!(
            self.navigation,
            Navigation::Focused(_) | Navigation::Full(FullView::Tree)
        );
        if uses_depth {
            self.rederive(true);
        }
    }

    /// Switches the unfocused view, dropping any focus.
    pub fn set_full_view(&mut self, view: FullView) {
        let next = Navigation::Full(view);
        if self.navigation == next {
            return;
        }

        self.navigation = next;
        self.rederive(true);
    }

    pub fn set_click_action(&mut self, click_action: ClickAction) {
        self.click_action = click_action;
    }

    /// Clears focus, shows the whole payload again and resets the viewport.
    pub fn reset(&mut self) {
        self.navigation = Navigation::default();
        self.transform.reset();
        self.rederive(false);
    }

    /// Advances the layout by one tick for payload `version`.
    ///
    /// Returns `true` while the layout is still moving.
    pub fn tick(&mut self, version: u64, delta_seconds: f32) -> bool {
        if version != self.version {
            tracing::warn!(
                tick_version = version,
                current_version = self.version,
                "dropping tick for a replaced payload"
            );
            return false;
        }

        self.layout.advance(delta_seconds)
    }

    pub fn begin_drag(&mut self, id: &str) -> bool {
        self.layout.begin_drag(id)
    }

    pub fn drag_to(&mut self, world: Vec2) {
        self.layout.drag_to(world);
    }

    pub fn end_drag(&mut self) {
        self.layout.end_drag();
    }

    /// Best fuzzy matches of `query` against display names, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query = query.trim();
        let Some(payload) = &self.payload else {
            return Vec::new();
        };
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits = payload
            .nodes
            .iter()
            .filter_map(|node| {
                let name = display_name(&node.id);
                fuzzy_match_score(&self.matcher, name, query).map(|score| SearchHit {
                    id: node.id.clone(),
                    name: name.to_string(),
                    score,
                })
            })
            .collect::<Vec<_>>();
        // Stable sort keeps payload order among equal scores.
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn payload(&self) -> Option<&GraphPayload> {
        self.payload.as_ref()
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn focus_id(&self) -> Option<&str> {
        match &self.navigation {
            Navigation::Focused(id) | Navigation::Ego(id) => Some(id),
            Navigation::Full(_) => None,
        }
    }

    pub fn full_view(&self) -> Option<FullView> {
        match self.navigation {
            Navigation::Full(view) => Some(view),
            _ => None,
        }
    }

    pub fn depth(&self) -> DepthLimit {
        self.depth
    }

    pub fn click_action(&self) -> ClickAction {
        self.click_action
    }

    /// Community partition of the whole payload.
    pub fn communities(&self) -> &CommunityMap {
        &self.communities
    }

    pub fn visible(&self) -> &VisibleGraph {
        &self.visible
    }

    pub fn cluster_node(&self, id: &str) -> Option<&ClusterNode> {
        self.visible.clusters.iter().find(|cluster| cluster.id == id)
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn phase(&self) -> Phase {
        self.layout.phase()
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.layout.position(id)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&str, Vec2)> {
        self.layout.positions()
    }

    pub fn node_at(&self, world: Vec2, max_distance: f32) -> Option<&str> {
        self.layout.node_at(world, max_distance)
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn transform_mut(&mut self) -> &mut ViewTransform {
        &mut self.transform
    }

    fn ensure_known(&self, id: &str) -> Result<()> {
        match &self.payload {
            Some(payload) if payload.contains(id) => Ok(()),
            _ => Err(GraphError::UnknownNode(id.to_string())),
        }
    }

    /// Recomputes the visible set for the current navigation and restarts the layout.
    fn rederive(&mut self, warm_start: bool) {
        let Some(payload) = &self.payload else {
            self.visible = VisibleGraph::default();
            self.layout.clear();
            return;
        };

        let visible = match &self.navigation {
            Navigation::Full(FullView::Graph) => VisibleGraph::plain(payload.clone()),
            Navigation::Full(FullView::Tree) => {
                let tree = build_tree(payload, None, self.depth);
                VisibleGraph::tree(tree_payload(payload, &tree), tree)
            }
            Navigation::Full(FullView::Clusters) => {
                let overlay = build_cluster_graph(payload, self.communities.clone());
                let membership_links = overlay.membership_links();
                VisibleGraph {
                    nodes: overlay.base.nodes,
                    links: overlay.base.links,
                    tree: None,
                    clusters: overlay.clusters,
                    cluster_edges: overlay.cluster_edges,
                    membership_links,
                }
            }
            Navigation::Focused(id) => {
                let tree = build_tree(payload, Some(id.as_str()), self.depth);
                VisibleGraph::tree(tree_payload(payload, &tree), tree)
            }
            Navigation::Ego(id) => {
                let ego = expand_node(payload, id);
                let tree = ego_tree(&ego, id);
                VisibleGraph::tree(ego, tree)
            }
        };

        tracing::debug!(
            navigation = ?self.navigation,
            depth = %self.depth,
            nodes = visible.nodes.len(),
            links = visible.links.len(),
            clusters = visible.clusters.len(),
            "derived visible graph"
        );
        self.visible = visible;
        self.restart_layout(warm_start);
    }

    fn restart_layout(&mut self, warm_start: bool) {
        let radius = self.simulation.collision_radius;
        let per_member = self.simulation.cluster_radius_per_member;
        let nodes = self
            .visible
            .nodes
            .iter()
            .map(|node| LayoutNode {
                id: node.id.clone(),
                radius,
            })
            .chain(self.visible.clusters.iter().map(|cluster| LayoutNode {
                id: cluster.id.clone(),
                radius: radius + cluster.size as f32 * per_member,
            }))
            .collect::<Vec<_>>();

        let edges = layout_edges(&self.visible.links, LinkKind::Base)
            .chain(
                self.visible
                    .cluster_edges
                    .iter()
                    .map(|edge| LayoutEdge {
                        source: edge.source.clone(),
                        target: edge.target.clone(),
                        kind: LinkKind::InterCluster,
                    }),
            )
            .chain(layout_edges(&self.visible.membership_links, LinkKind::Membership))
            .collect::<Vec<_>>();

        match &self.visible.tree {
            Some(tree) => {
                let placed = tree_layout(tree, &self.tree_layout);
                self.layout.set_fixed(placed, nodes, &edges);
            }
            None => self.layout.set_graph(nodes, &edges, warm_start),
        }
    }
}

fn layout_edges(links: &[Edge], kind: LinkKind) -> impl Iterator<Item = LayoutEdge> + '_ {
    links.iter().map(move |link| LayoutEdge {
        source: link.source.clone(),
        target: link.target.clone(),
        kind,
    })
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn payload(nodes: &[&str], links: &[(&str, &str)]) -> GraphPayload {
        GraphPayload::new(
            nodes.iter().map(|id| Node::new(*id)).collect(),
            links.iter().map(|(s, t)| Edge::new(*s, *t)).collect(),
        )
    }

    fn chain() -> GraphPayload {
        payload(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")])
    }

    fn visible_ids(controller: &InteractionController) -> Vec<&str> {
        controller
            .visible()
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .collect()
    }

    #[test]
    fn loading_shows_full_graph_and_starts_simulation() {
        let mut controller = InteractionController::default();
        let version = controller.load_payload(chain());

        assert_eq!(version, 1);
        assert_eq!(controller.navigation(), &Navigation::Full(FullView::Graph));
        assert_eq!(visible_ids(&controller), ["a", "b", "c", "d"]);
        assert_eq!(controller.phase(), Phase::Simulating);
        assert_eq!(controller.positions().count(), 4);
    }

    #[test]
    fn focus_builds_tree_at_current_depth() {
        let mut controller = InteractionController::default();
        controller.load_payload(chain());
        controller.set_depth(DepthLimit::Bounded(1));

        controller.focus("b").unwrap();
        assert_eq!(controller.focus_id(), Some("b"));
        assert_eq!(visible_ids(&controller), ["b", "c"]);
        assert_eq!(controller.visible().links, vec![Edge::new("b", "c")]);
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn depth_change_keeps_focus() {
        let mut controller = InteractionController::default();
        controller.load_payload(chain());
        controller.set_depth(DepthLimit::Bounded(1));
        controller.focus("a").unwrap();

        controller.set_depth(DepthLimit::Unbounded);
        assert_eq!(controller.focus_id(), Some("a"));
        assert_eq!(visible_ids(&controller), ["a", "b", "c", "d"]);
    }

    #[test]
    fn expand_shows_neighborhood() {
        let mut controller = InteractionController::default();
        controller.load_payload(chain());

        controller.click("b").unwrap();
        assert_eq!(controller.navigation(), &Navigation::Ego("b".to_string()));
        assert_eq!(visible_ids(&controller), ["a", "b", "c"]);
        let tree = controller.visible().tree.as_ref().unwrap();
        assert_eq!(tree[0].id, "b");
        assert!(tree[1..].iter().all(|entry| entry.depth == 1));
    }

    #[test]
    fn click_follows_configured_action() {
        let mut controller = InteractionController::default();
        controller.set_click_action(ClickAction::Focus);
        controller.load_payload(chain());

        controller.click("c").unwrap();
        assert_eq!(controller.navigation(), &Navigation::Focused("c".to_string()));
    }

    #[test]
    fn unknown_node_is_rejected_and_view_kept() {
        let mut controller = InteractionController::default();
        controller.load_payload(chain());

        let error = controller.focus("ghost").unwrap_err();
        assert!(matches!(error, GraphError::UnknownNode(id) if id == "ghost"));
        assert_eq!(controller.navigation(), &Navigation::Full(FullView::Graph));
        assert_eq!(visible_ids(&controller).len(), 4);
    }

    #[test]
    fn reset_restores_payload_and_viewport() {
        let mut controller = InteractionController::default();
        controller.load_payload(chain());
        controller.expand("d").unwrap();
        controller.transform_mut().pan_by(vec2(30.0, 30.0));

        controller.reset();
        assert_eq!(controller.focus_id(), None);
        assert_eq!(visible_ids(&controller), ["a", "b", "c", "d"]);
        assert_eq!(controller.transform(), ViewTransform::default());
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let mut controller = InteractionController::default();
        let first = controller.load_payload(chain());
        let second = controller.load_payload(payload(&["x", "y"], &[("x", "y")]));

        let before = controller.positions().map(|(_, p)| p).collect::<Vec<_>>();
        assert!(!controller.tick(first, 1.0 / 60.0));
        let after = controller.positions().map(|(_, p)| p).collect::<Vec<_>>();
        assert_eq!(before, after);

        assert!(controller.tick(second, 1.0 / 60.0));
    }

    #[test]
    fn fetch_failure_keeps_view() {
        let mut controller = InteractionController::default();
        controller.load_payload(chain());
        controller.focus("b").unwrap();

        controller.fetch_failed(&"connection refused");
        assert_eq!(controller.focus_id(), Some("b"));
        assert_eq!(controller.version(), 1);
    }

    #[test]
    fn cluster_view_overlays_communities() {
        let mut controller = InteractionController::default();
        controller.load_payload(payload(&["a", "b", "c"], &[("a", "b")]));
        controller.set_full_view(FullView::Clusters);

        let visible = controller.visible();
        assert_eq!(visible.nodes.len(), 3);
        assert_eq!(visible.clusters.len(), 2);
        assert_eq!(visible.membership_links.len(), 3);
        assert!(controller.position("cluster-0").is_some());
        assert!(controller.position("cluster-1").is_some());

        // Cluster nodes are not navigable.
        controller.click("cluster-0").unwrap();
        assert_eq!(controller.full_view(), Some(FullView::Clusters));
    }

    #[test]
    fn switching_force_views_keeps_positions() {
        let mut controller = InteractionController::default();
        controller.load_payload(chain());
        for _ in 0..50 {
            controller.tick(1, 1.0 / 60.0);
        }
        let settled = controller.position("a").unwrap();

        controller.set_full_view(FullView::Clusters);
        assert_eq!(controller.position("a"), Some(settled));
        assert_eq!(controller.phase(), Phase::Simulating);

        let reloaded = controller.load_payload(chain());
        assert_eq!(reloaded, 2);
        assert_ne!(controller.position("a"), Some(settled));
    }

    #[test]
    fn search_ranks_display_names() {
        let mut controller = InteractionController::default();
        controller.load_payload(payload(
            &[
                "/nix/store/0123456789abcdefghijklmnopqrstuv-hello-2.12.drv",
                "/nix/store/abcdefghijklmnopqrstuv0123456789-bash-5.2.drv",
            ],
            &[],
        ));

        let hits = controller.search("hello", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "hello-2.12.drv");
        assert!(controller.search("   ", 5).is_empty());
        assert!(controller.search("zzzz", 5).is_empty());
    }
}
