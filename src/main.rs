mod app;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nix_drv_graph::config::{ClickAction, SimulationConfig, TreeLayoutConfig, ViewerConfig};
use nix_drv_graph::graph::{DepthLimit, PayloadFormat};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph payload: `{nodes, links}` JSON or `nix-store --query --graph` DOT output
    path: PathBuf,

    #[arg(long, value_enum, default_value_t = PayloadFormat::Auto)]
    format: PayloadFormat,

    /// Initial tree depth, or `inf` for no limit
    #[arg(long, default_value_t = DepthLimit::default())]
    depth: DepthLimit,

    /// What clicking a node does
    #[arg(long = "click", value_enum, default_value_t = ClickAction::Expand)]
    click_action: ClickAction,

    #[arg(long, default_value_t = 150.0)]
    link_distance: f32,

    /// Many-body strength; negative values repel
    #[arg(long, default_value_t = -500.0, allow_hyphen_values = true)]
    charge: f32,

    #[arg(long, default_value_t = 40.0)]
    collision_radius: f32,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "nix_drv_graph=info")]
    log_level: String,
}

impl Args {
    fn viewer_config(&self) -> Result<ViewerConfig> {
        let payload_path = self
            .path
            .canonicalize()
            .with_context(|| format!("cannot open graph payload {}", self.path.display()))?;

        let mut simulation = SimulationConfig::default().with_link_distance(self.link_distance);
        simulation.charge = self.charge;
        simulation.collision_radius = self.collision_radius;

        Ok(ViewerConfig {
            payload_path,
            format: self.format,
            depth: self.depth,
            click_action: self.click_action,
            simulation,
            tree_layout: TreeLayoutConfig::default(),
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    let config = args.viewer_config()?;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "nix-drv-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::GraphViewerApp::new(cc, config)))),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
