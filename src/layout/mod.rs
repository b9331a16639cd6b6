//! Node placement for whatever node/edge set is currently visible.
//!
//! Two modes share one position store: a cooling force simulation stepped by
//! the caller through [`LayoutEngine::advance`], and a fixed rank layout for
//! trees computed once by [`tree_layout`]. Positions are keyed by node id and
//! never written back into graph data.

mod forces;
mod hierarchy;
mod quadtree;

use std::collections::HashMap;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use crate::config::SimulationConfig;
use crate::util::stable_pair;
use forces::{accumulate_collision_pairs, accumulate_link_springs, accumulate_repulsion_for_node};
pub use hierarchy::tree_layout;
use quadtree::QuadNode;

const MAX_SPEED: f32 = 120.0;
const COLLISION_STRENGTH: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Base,
    InterCluster,
    Membership,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    Force,
    Hierarchical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Simulating,
}

/// A node to place, with its no-overlap radius.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub radius: f32,
}

/// A link between two node ids; unknown ids are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutEdge {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Fixed position while the node is held by a drag.
    pub pin: Option<Vec2>,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct LayoutLink {
    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) rest_length: f32,
    pub(crate) kind: LinkKind,
}

#[derive(Default)]
struct PhysicsScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    radii: Vec<f32>,
}

pub struct LayoutEngine {
    config: SimulationConfig,
    mode: LayoutMode,
    bodies: Vec<Body>,
    links: Vec<LayoutLink>,
    degrees: Vec<usize>,
    index_by_id: HashMap<String, usize>,
    alpha: f32,
    alpha_target: f32,
    dragging: Option<usize>,
    ticks: u64,
    scratch: PhysicsScratch,
}

impl LayoutEngine {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            mode: LayoutMode::Force,
            bodies: Vec::new(),
            links: Vec::new(),
            degrees: Vec::new(),
            index_by_id: HashMap::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            dragging: None,
            ticks: 0,
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn phase(&self) -> Phase {
        if self.is_settled() {
            Phase::Idle
        } else {
            Phase::Simulating
        }
    }

    pub fn is_settled(&self) -> bool {
        self.mode == LayoutMode::Hierarchical
            || (self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.index_by_id
            .get(id)
            .map(|&index| self.bodies[index].position)
    }

    /// Current `(id, position)` pairs in node order.
    pub fn positions(&self) -> impl Iterator<Item = (&str, Vec2)> {
        self.bodies
            .iter()
            .map(|body| (body.id.as_str(), body.position))
    }

    /// Replaces the simulated set and reheats the simulation.
    ///
    /// With `warm_start`, nodes that were already placed keep their position;
    /// every other node starts on a seeded ring around the center.
    pub fn set_graph(&mut self, nodes: Vec<LayoutNode>, edges: &[LayoutEdge], warm_start: bool) {
        let previous = if warm_start {
            self.bodies
                .drain(..)
                .map(|body| (body.id, body.position))
                .collect::<HashMap<_, _>>()
        } else {
            HashMap::new()
        };

        let count = nodes.len();
        let ring_radius = (count as f32).sqrt() * self.config.link_distance * 0.5;
        let jitter = self.config.link_distance * 0.3;
        self.bodies = nodes
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                let position = previous.get(&node.id).copied().unwrap_or_else(|| {
                    let angle = (index as f32 / count.max(1) as f32) * TAU;
                    let (jx, jy) = stable_pair(&node.id);
                    self.config.center
                        + vec2(angle.cos(), angle.sin()) * ring_radius
                        + vec2(jx, jy) * jitter
                });
                Body {
                    id: node.id,
                    position,
                    velocity: Vec2::ZERO,
                    pin: None,
                    radius: node.radius,
                }
            })
            .collect();
        self.rebuild_links(edges);

        self.mode = LayoutMode::Force;
        self.dragging = None;
        self.alpha_target = 0.0;
        self.ticks = 0;
        self.reheat();
        tracing::debug!(
            nodes = self.bodies.len(),
            links = self.links.len(),
            warm_start,
            "restarted force layout"
        );
    }

    /// Places nodes at fixed positions; no simulation runs in this mode.
    pub fn set_fixed(
        &mut self,
        placed: Vec<(String, Vec2)>,
        nodes: Vec<LayoutNode>,
        edges: &[LayoutEdge],
    ) {
        let placed = placed.into_iter().collect::<HashMap<_, _>>();
        self.bodies = nodes
            .into_iter()
            .map(|node| Body {
                position: placed.get(&node.id).copied().unwrap_or(Vec2::ZERO) + self.config.center,
                id: node.id,
                velocity: Vec2::ZERO,
                pin: None,
                radius: node.radius,
            })
            .collect();
        self.rebuild_links(edges);

        self.mode = LayoutMode::Hierarchical;
        self.dragging = None;
        self.alpha = 0.0;
        self.alpha_target = 0.0;
        self.ticks = 0;
        tracing::debug!(nodes = self.bodies.len(), "placed hierarchical layout");
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.links.clear();
        self.degrees.clear();
        self.index_by_id.clear();
        self.dragging = None;
        self.alpha = 0.0;
        self.alpha_target = 0.0;
    }

    fn rebuild_links(&mut self, edges: &[LayoutEdge]) {
        self.index_by_id = self
            .bodies
            .iter()
            .enumerate()
            .map(|(index, body)| (body.id.clone(), index))
            .collect();

        self.links.clear();
        self.degrees = vec![0; self.bodies.len()];
        for edge in edges {
            let (Some(&source), Some(&target)) = (
                self.index_by_id.get(&edge.source),
                self.index_by_id.get(&edge.target),
            ) else {
                continue;
            };

            let rest_length = match edge.kind {
                LinkKind::Base => self.config.link_distance,
                LinkKind::InterCluster => self.config.inter_cluster_distance,
                LinkKind::Membership => self.config.membership_distance,
            };
            self.degrees[source] += 1;
            self.degrees[target] += 1;
            self.links.push(LayoutLink {
                source,
                target,
                rest_length,
                kind: edge.kind,
            });
        }
    }

    /// Restores full energy so the simulation runs again from the current positions.
    pub fn reheat(&mut self) {
        if self.mode == LayoutMode::Force {
            self.alpha = 1.0;
        }
    }

    /// Advances the simulation by one tick scaled to `delta_seconds`.
    ///
    /// Returns `false` once the energy has decayed below the threshold (or in
    /// hierarchical mode); further calls are then no-ops until the next
    /// restart or drag.
    pub fn advance(&mut self, delta_seconds: f32) -> bool {
        if self.is_settled() || self.bodies.is_empty() {
            return false;
        }

        let time_step_scale = (delta_seconds * 60.0).clamp(0.25, 3.0);
        let decay = 1.0 - (1.0 - self.config.alpha_decay).powf(time_step_scale);
        self.alpha += (self.alpha_target - self.alpha) * decay;
        self.ticks += 1;

        let node_count = self.bodies.len();
        let scratch = &mut self.scratch;
        scratch.forces.clear();
        scratch.forces.resize(node_count, Vec2::ZERO);
        scratch.positions.clear();
        scratch.radii.clear();
        for body in &self.bodies {
            scratch.positions.push(body.position);
            scratch.radii.push(body.radius);
        }

        let alpha = self.alpha;
        let forces = &mut scratch.forces;
        let positions = &scratch.positions;
        let radii = &scratch.radii;

        let quadtree = if node_count > 1 {
            QuadNode::build(positions, radii)
        } else {
            None
        };
        if let Some(quadtree) = quadtree {
            let strength = -self.config.charge * alpha;
            for (index, force) in forces.iter_mut().enumerate() {
                accumulate_repulsion_for_node(
                    &quadtree,
                    index,
                    positions,
                    strength,
                    self.config.softening,
                    self.config.barnes_hut_theta,
                    force,
                );
            }

            accumulate_collision_pairs(
                &quadtree,
                &quadtree,
                true,
                positions,
                radii,
                COLLISION_STRENGTH,
                forces,
            );
        }

        accumulate_link_springs(&self.bodies, &self.links, &self.degrees, alpha, forces);

        let velocity_keep = (1.0 - self.config.velocity_decay).powf(time_step_scale);
        for (body, force) in self.bodies.iter_mut().zip(forces.iter()) {
            if let Some(pin) = body.pin {
                body.position = pin;
                body.velocity = Vec2::ZERO;
                continue;
            }

            let mut velocity = (body.velocity + *force * time_step_scale) * velocity_keep;
            let speed = velocity.length();
            if speed > MAX_SPEED {
                velocity *= MAX_SPEED / speed;
            }
            body.velocity = velocity;
            body.position += velocity * time_step_scale;
        }

        self.apply_centering();
        !self.is_settled()
    }

    /// Shifts free nodes so the centroid of the whole set sits on the center.
    fn apply_centering(&mut self) {
        let count = self.bodies.len() as f32;
        let mut centroid = Vec2::ZERO;
        for body in &self.bodies {
            centroid += body.position;
        }
        centroid /= count;

        let shift = self.config.center - centroid;
        if shift.length_sq() <= 1e-12 {
            return;
        }
        for body in self.bodies.iter_mut().filter(|body| body.pin.is_none()) {
            body.position += shift;
        }
    }

    /// Runs ticks of `delta_seconds` until settled or `max_ticks` is reached.
    pub fn run_until_settled(&mut self, delta_seconds: f32, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.advance(delta_seconds) {
            ticks += 1;
        }
        ticks
    }

    /// Pins `id` where it is and keeps the simulation warm while held.
    pub fn begin_drag(&mut self, id: &str) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };

        let body = &mut self.bodies[index];
        body.pin = Some(body.position);
        self.dragging = Some(index);
        if self.mode == LayoutMode::Force {
            self.alpha_target = self.config.drag_alpha_target;
            // Restart a settled simulation so the rest of the graph reacts.
            self.alpha = self.alpha.max(self.config.alpha_min);
        }
        true
    }

    pub fn drag_to(&mut self, world: Vec2) {
        let Some(index) = self.dragging else {
            return;
        };

        let body = &mut self.bodies[index];
        body.pin = Some(world);
        if self.mode == LayoutMode::Hierarchical {
            body.position = world;
        }
    }

    /// Releases the held node; physics resumes for it and the energy decays.
    pub fn end_drag(&mut self) {
        if let Some(index) = self.dragging.take() {
            self.bodies[index].pin = None;
        }
        self.alpha_target = 0.0;
    }

    pub fn dragging(&self) -> Option<&str> {
        self.dragging.map(|index| self.bodies[index].id.as_str())
    }

    /// Closest node whose center lies within `max_distance` of `world`.
    pub fn node_at(&self, world: Vec2, max_distance: f32) -> Option<&str> {
        self.bodies
            .iter()
            .map(|body| (body, (body.position - world).length()))
            .filter(|(_, distance)| *distance <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(body, _)| body.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(ids: &[&str]) -> Vec<LayoutNode> {
        ids.iter()
            .map(|id| LayoutNode {
                id: id.to_string(),
                radius: 20.0,
            })
            .collect()
    }

    fn edge(source: &str, target: &str) -> LayoutEdge {
        LayoutEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind: LinkKind::Base,
        }
    }

    fn triangle() -> LayoutEngine {
        let mut engine = LayoutEngine::new(SimulationConfig::default());
        engine.set_graph(
            nodes(&["a", "b", "c"]),
            &[edge("a", "b"), edge("b", "c"), edge("c", "a")],
            false,
        );
        engine
    }

    #[test]
    fn simulation_cools_down_and_stops() {
        let mut engine = triangle();
        assert_eq!(engine.phase(), Phase::Simulating);

        let ticks = engine.run_until_settled(1.0 / 60.0, 10_000);
        assert!(ticks > 100 && ticks < 1_000, "ticks = {ticks}");
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.advance(1.0 / 60.0));
    }

    #[test]
    fn linked_nodes_settle_near_rest_length() {
        let mut engine = LayoutEngine::new(SimulationConfig::default());
        engine.set_graph(nodes(&["a", "b"]), &[edge("a", "b")], false);
        engine.run_until_settled(1.0 / 60.0, 10_000);

        let distance = (engine.position("a").unwrap() - engine.position("b").unwrap()).length();
        assert!(distance > 100.0 && distance < 400.0, "distance = {distance}");
    }

    #[test]
    fn centroid_stays_on_center() {
        let mut engine = triangle();
        engine.run_until_settled(1.0 / 60.0, 10_000);
        let centroid = engine.positions().fold(Vec2::ZERO, |sum, (_, p)| sum + p) / 3.0;
        assert!(centroid.length() < 1e-2, "centroid = {centroid:?}");
    }

    #[test]
    fn no_two_nodes_overlap_after_settling() {
        let ids = (0..30).map(|index| format!("n{index}")).collect::<Vec<_>>();
        let mut engine = LayoutEngine::new(SimulationConfig::default());
        engine.set_graph(
            ids.iter()
                .map(|id| LayoutNode {
                    id: id.clone(),
                    radius: 20.0,
                })
                .collect(),
            &[],
            false,
        );
        engine.run_until_settled(1.0 / 60.0, 10_000);

        let positions = engine.positions().map(|(_, p)| p).collect::<Vec<_>>();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let distance = (positions[i] - positions[j]).length();
                assert!(distance >= 2.0 * 20.0 - 0.5, "overlap at {distance}");
            }
        }
    }

    #[test]
    fn seeding_is_deterministic() {
        let first = triangle();
        let second = triangle();
        let a = first.positions().collect::<Vec<_>>();
        let b = second.positions().collect::<Vec<_>>();
        assert_eq!(a, b);
    }

    #[test]
    fn dragged_node_follows_pointer_and_keeps_energy_up() {
        let mut engine = triangle();
        engine.run_until_settled(1.0 / 60.0, 10_000);
        assert_eq!(engine.phase(), Phase::Idle);

        assert!(engine.begin_drag("a"));
        engine.drag_to(vec2(500.0, 500.0));
        for _ in 0..400 {
            assert!(engine.advance(1.0 / 60.0));
        }
        assert_eq!(engine.position("a"), Some(vec2(500.0, 500.0)));
        assert!(engine.alpha() > 0.25);

        engine.end_drag();
        assert!(engine.bodies().iter().all(|body| body.pin.is_none()));
        engine.run_until_settled(1.0 / 60.0, 10_000);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn warm_start_keeps_known_positions() {
        let mut engine = triangle();
        engine.run_until_settled(1.0 / 60.0, 10_000);
        let before = engine.position("a").unwrap();

        engine.set_graph(nodes(&["a", "d"]), &[edge("a", "d")], true);
        assert_eq!(engine.position("a"), Some(before));
        assert!(engine.position("b").is_none());
        assert_eq!(engine.phase(), Phase::Simulating);
    }

    #[test]
    fn dangling_layout_edges_are_ignored() {
        let mut engine = LayoutEngine::new(SimulationConfig::default());
        engine.set_graph(nodes(&["a"]), &[edge("a", "ghost")], false);
        assert!(engine.links.is_empty());
        engine.run_until_settled(1.0 / 60.0, 10_000);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn inter_cluster_links_are_longer() {
        let mut engine = LayoutEngine::new(SimulationConfig::default());
        engine.set_graph(
            nodes(&["a", "b", "cluster-0", "cluster-1"]),
            &[
                edge("a", "b"),
                LayoutEdge {
                    source: "cluster-0".to_string(),
                    target: "cluster-1".to_string(),
                    kind: LinkKind::InterCluster,
                },
            ],
            false,
        );
        assert!(engine.links[1].rest_length > engine.links[0].rest_length);
        assert_eq!(engine.links[1].kind, LinkKind::InterCluster);
    }

    #[test]
    fn fixed_layout_never_simulates() {
        let mut engine = LayoutEngine::new(SimulationConfig::default());
        engine.set_fixed(
            vec![("a".to_string(), vec2(-10.0, 0.0)), ("b".to_string(), vec2(10.0, 0.0))],
            nodes(&["a", "b"]),
            &[edge("a", "b")],
        );
        assert_eq!(engine.mode(), LayoutMode::Hierarchical);
        assert!(!engine.advance(1.0 / 60.0));
        assert_eq!(engine.position("a"), Some(vec2(-10.0, 0.0)));

        assert!(engine.begin_drag("b"));
        engine.drag_to(vec2(40.0, 40.0));
        engine.end_drag();
        assert_eq!(engine.position("b"), Some(vec2(40.0, 40.0)));
    }

    #[test]
    fn hit_test_picks_closest_node() {
        let mut engine = LayoutEngine::new(SimulationConfig::default());
        engine.set_fixed(
            vec![("a".to_string(), vec2(0.0, 0.0)), ("b".to_string(), vec2(10.0, 0.0))],
            nodes(&["a", "b"]),
            &[],
        );
        assert_eq!(engine.node_at(vec2(7.0, 0.0), 6.0), Some("b"));
        assert_eq!(engine.node_at(vec2(100.0, 0.0), 6.0), None);
    }
}
