//! Tunables for the layout engines and the viewer.

use std::path::PathBuf;

use clap::ValueEnum;
use eframe::egui::Vec2;

use crate::graph::{DepthLimit, PayloadFormat};

/// Physics constants for the force simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Many-body strength; negative values repel.
    pub charge: f32,
    /// Rest length of links from the base graph.
    pub link_distance: f32,
    /// Rest length of cluster-to-cluster links.
    pub inter_cluster_distance: f32,
    /// Rest length of member-to-cluster links.
    pub membership_distance: f32,
    pub collision_radius: f32,
    /// Extra collision radius per cluster member.
    pub cluster_radius_per_member: f32,
    pub center: Vec2,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    /// Energy level held while a node is being dragged.
    pub drag_alpha_target: f32,
    pub barnes_hut_theta: f32,
    pub softening: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            charge: -500.0,
            link_distance: 150.0,
            inter_cluster_distance: 300.0,
            membership_distance: 60.0,
            collision_radius: 40.0,
            cluster_radius_per_member: 2.0,
            center: Vec2::ZERO,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            barnes_hut_theta: 0.72,
            softening: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Keeps the inter-cluster rest length proportional to a new base length.
    pub fn with_link_distance(mut self, link_distance: f32) -> Self {
        let ratio = self.inter_cluster_distance / self.link_distance;
        self.link_distance = link_distance;
        self.inter_cluster_distance = link_distance * ratio;
        self
    }
}

/// Spacing for the rank-based tree layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeLayoutConfig {
    /// Horizontal distance between depth ranks.
    pub rank_spacing: f32,
    /// Vertical distance between neighboring leaves.
    pub sibling_spacing: f32,
}

impl Default for TreeLayoutConfig {
    fn default() -> Self {
        Self {
            rank_spacing: 180.0,
            sibling_spacing: 56.0,
        }
    }
}

/// What a click on a node does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ClickAction {
    /// Show the clicked node with its direct neighbors.
    #[default]
    Expand,
    /// Show the tree rooted at the clicked node.
    Focus,
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub payload_path: PathBuf,
    pub format: PayloadFormat,
    pub depth: DepthLimit,
    pub click_action: ClickAction,
    pub simulation: SimulationConfig,
    pub tree_layout: TreeLayoutConfig,
}
