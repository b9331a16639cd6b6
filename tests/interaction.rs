use eframe::egui::{Vec2, vec2};

use nix_drv_graph::config::{ClickAction, SimulationConfig, TreeLayoutConfig};
use nix_drv_graph::graph::{DepthLimit, Edge, GraphPayload, Node};
use nix_drv_graph::interaction::{FullView, InteractionController, Navigation};
use nix_drv_graph::layout::{LayoutEdge, LayoutEngine, LayoutNode, LinkKind, Phase};
use nix_drv_graph::GraphError;

fn diamond() -> GraphPayload {
    GraphPayload::new(
        ["top.drv", "left.drv", "right.drv", "bottom.patch"]
            .into_iter()
            .map(Node::new)
            .collect(),
        vec![
            Edge::new("top.drv", "left.drv"),
            Edge::new("top.drv", "right.drv"),
            Edge::new("left.drv", "bottom.patch"),
            Edge::new("right.drv", "bottom.patch"),
            Edge::new("left.drv", "missing.sh"),
        ],
    )
}

fn run_to_rest(controller: &mut InteractionController, version: u64) -> usize {
    let mut ticks = 0;
    while controller.tick(version, 1.0 / 60.0) {
        ticks += 1;
        assert!(ticks < 5_000, "layout never settled");
    }
    ticks
}

#[test]
fn full_session_walkthrough() {
    let mut controller = InteractionController::new(
        SimulationConfig::default(),
        TreeLayoutConfig::default(),
    );
    let version = controller.load_payload(diamond());
    assert_eq!(controller.communities().count(), 1);

    run_to_rest(&mut controller, version);
    assert_eq!(controller.phase(), Phase::Idle);

    controller.set_full_view(FullView::Tree);
    let tree = controller.visible().tree.clone().unwrap();
    let ids = tree.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, ["top.drv", "left.drv", "bottom.patch", "right.drv"]);
    assert_eq!(tree[2].parent_id.as_deref(), Some("left.drv"));

    controller.set_click_action(ClickAction::Focus);
    controller.click("left.drv").unwrap();
    assert_eq!(controller.navigation(), &Navigation::Focused("left.drv".to_owned()));
    assert_eq!(controller.visible().nodes.len(), 2);

    controller.set_depth(DepthLimit::Bounded(0));
    assert_eq!(controller.focus_id(), Some("left.drv"));
    assert_eq!(controller.visible().nodes.len(), 1);

    controller.expand("bottom.patch").unwrap();
    let ego = controller
        .visible()
        .nodes
        .iter()
        .map(|node| node.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ego, ["left.drv", "right.drv", "bottom.patch"]);

    assert!(matches!(
        controller.expand("missing.sh"),
        Err(GraphError::UnknownNode(_))
    ));

    controller.reset();
    assert_eq!(controller.navigation(), &Navigation::Full(FullView::Graph));
    assert_eq!(controller.visible().nodes.len(), 4);
    assert_eq!(controller.visible().links.len(), 5);
}

#[test]
fn rank_layout_is_repeatable_across_controllers() {
    let positions = || {
        let mut controller = InteractionController::default();
        controller.load_payload(diamond());
        controller.focus("top.drv").unwrap();
        controller
            .positions()
            .map(|(id, position)| (id.to_owned(), position))
            .collect::<Vec<_>>()
    };
    assert_eq!(positions(), positions());
}

#[test]
fn dragging_in_rank_layout_moves_only_the_node() {
    let mut controller = InteractionController::default();
    controller.load_payload(diamond());
    controller.focus("top.drv").unwrap();
    let right = controller.position("right.drv").unwrap();

    assert!(controller.begin_drag("left.drv"));
    controller.drag_to(vec2(-400.0, 250.0));
    controller.end_drag();

    assert_eq!(controller.position("left.drv"), Some(vec2(-400.0, 250.0)));
    assert_eq!(controller.position("right.drv"), Some(right));
}

#[test]
fn engine_runs_without_a_timer() {
    let mut engine = LayoutEngine::new(SimulationConfig::default());
    let nodes = (0..12)
        .map(|index| LayoutNode {
            id: format!("n{index}"),
            radius: 40.0,
        })
        .collect::<Vec<_>>();
    let edges = (1..12)
        .map(|index| LayoutEdge {
            source: "n0".to_owned(),
            target: format!("n{index}"),
            kind: LinkKind::Base,
        })
        .collect::<Vec<_>>();
    engine.set_graph(nodes, &edges, false);

    let ticks = engine.run_until_settled(1.0 / 60.0, 10_000);
    assert!(ticks < 10_000);
    assert_eq!(engine.phase(), Phase::Idle);

    let hub = engine.position("n0").unwrap();
    let centroid = engine.positions().fold(Vec2::ZERO, |sum, (_, p)| sum + p) / 12.0;
    assert!((hub - centroid).length() < 150.0);
}
