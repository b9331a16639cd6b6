use eframe::egui::{self, Ui};

use nix_drv_graph::config::ClickAction;
use nix_drv_graph::graph::DepthLimit;
use nix_drv_graph::interaction::{FullView, Navigation};
use nix_drv_graph::layout::Phase;
use nix_drv_graph::util::display_name;

use super::ViewModel;

const MAX_DEPTH_SLIDER: usize = 10;

/// Upper slider bound, stretched so a configured depth above it stays reachable.
fn depth_slider_max(current: DepthLimit) -> usize {
    match current {
        DepthLimit::Bounded(depth) => depth.max(MAX_DEPTH_SLIDER),
        DepthLimit::Unbounded => MAX_DEPTH_SLIDER,
    }
}

/// The depth to apply after this frame, if the user touched either widget.
fn edited_depth(
    current: DepthLimit,
    depth: usize,
    unbounded: bool,
    touched: bool,
) -> Option<DepthLimit> {
    if !touched {
        return None;
    }
    let next = if unbounded {
        DepthLimit::Unbounded
    } else {
        DepthLimit::Bounded(depth)
    };
    (next != current).then_some(next)
}

impl ViewModel {
    pub(super) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        self.draw_navigation(ui);
        ui.separator();
        self.draw_depth(ui);
        ui.separator();
        self.draw_click_action(ui);
        ui.separator();
        self.draw_search(ui);
        ui.separator();

        ui.checkbox(&mut self.live_layout, "Live layout simulation")
            .on_hover_text("Keep stepping the force layout while it has energy left.");
        let phase = match self.controller.phase() {
            Phase::Idle => "settled",
            Phase::Simulating => "simulating",
        };
        ui.label(format!(
            "layout: {phase}  |  alpha {:.3}",
            self.controller.layout().alpha()
        ));
        ui.label(format!(
            "visible: {} nodes, {} links",
            self.controller.visible().nodes.len(),
            self.controller.visible().links.len()
        ));
    }

    fn draw_navigation(&mut self, ui: &mut Ui) {
        let mut view = self.controller.full_view();
        ui.horizontal_wrapped(|ui| {
            for option in [FullView::Graph, FullView::Tree, FullView::Clusters] {
                ui.selectable_value(&mut view, Some(option), option.label());
            }
        });
        if let Some(view) = view
            && self.controller.full_view() != Some(view)
        {
            self.controller.set_full_view(view);
        }

        let focus_text = match self.controller.navigation() {
            Navigation::Full(_) => "no focus".to_owned(),
            Navigation::Focused(id) => format!("tree from {}", display_name(id)),
            Navigation::Ego(id) => format!("neighbors of {}", display_name(id)),
        };
        ui.label(focus_text);

        if ui
            .button("Reset")
            .on_hover_text("Clear the focus, show the whole graph and reset zoom.")
            .clicked()
        {
            self.controller.reset();
        }
    }

    fn draw_depth(&mut self, ui: &mut Ui) {
        let current = self.controller.depth();
        let mut unbounded = current == DepthLimit::Unbounded;
        let mut depth = match current {
            DepthLimit::Bounded(depth) => depth,
            DepthLimit::Unbounded => MAX_DEPTH_SLIDER,
        };

        let slider = ui
            .add_enabled(
                !unbounded,
                egui::Slider::new(&mut depth, 0..=depth_slider_max(current)).text("Tree depth"),
            )
            .on_hover_text("Maximum hop count followed from the tree root.");
        let toggle = ui.checkbox(&mut unbounded, "Unbounded depth");

        if let Some(next) =
            edited_depth(current, depth, unbounded, slider.changed() || toggle.changed())
        {
            self.controller.set_depth(next);
        }
    }

    fn draw_click_action(&mut self, ui: &mut Ui) {
        let mut click_action = self.controller.click_action();
        ui.label("Clicking a node");
        ui.horizontal(|ui| {
            ui.selectable_value(&mut click_action, ClickAction::Expand, "Show neighbors");
            ui.selectable_value(&mut click_action, ClickAction::Focus, "Show tree");
        });
        self.controller.set_click_action(click_action);
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search by name")
            .on_hover_text("Fuzzy-match node names; click a result to focus it.");
        if ui.text_edit_singleline(&mut self.search).changed() {
            self.refresh_search();
        }

        let mut picked = None;
        for hit in &self.search_hits {
            if ui
                .selectable_label(self.controller.focus_id() == Some(hit.id.as_str()), &hit.name)
                .on_hover_text(&hit.id)
                .clicked()
            {
                picked = Some(hit.id.clone());
            }
        }

        if let Some(id) = picked
            && let Err(error) = self.controller.click(&id)
        {
            tracing::warn!(%error, "ignoring search selection");
        }
    }
}
