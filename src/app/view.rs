use std::collections::{HashMap, HashSet};

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, vec2};

use nix_drv_graph::graph::{NodeKind, cluster_id};
use nix_drv_graph::interaction::ViewTransform;
use nix_drv_graph::util::display_name;

use super::ViewModel;
use super::render_utils::{
    circle_visible, cluster_color, dim_color, draw_arrow, draw_background, edge_visible,
    kind_color,
};

const NODE_RADIUS: f32 = 6.0;
const HIT_RADIUS_PX: f32 = 8.0;
const LABEL_NODE_LIMIT: usize = 60;

impl ViewModel {
    fn handle_zoom_and_pan(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            let pointer = ui
                .input(|input| input.pointer.hover_pos())
                .unwrap_or_else(|| rect.center());
            self.controller
                .transform_mut()
                .zoom_at(rect, pointer, scroll);
        }

        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.controller.transform_mut().pan_by(response.drag_delta());
        }
    }

    fn node_under_pointer(&self, ui: &Ui, rect: Rect) -> Option<String> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) {
            return None;
        }

        let transform = self.controller.transform();
        let world = transform.screen_to_world(rect, pointer);
        let reach = (HIT_RADIUS_PX / transform.zoom).max(NODE_RADIUS);
        self.controller.node_at(world, reach).map(str::to_owned)
    }

    fn handle_node_drag(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(id) = self.hovered.as_deref()
        {
            self.controller.begin_drag(id);
        }

        if response.dragged_by(egui::PointerButton::Primary)
            && let Some(pointer) = ui.input(|input| input.pointer.hover_pos())
        {
            let world = self.controller.transform().screen_to_world(rect, pointer);
            self.controller.drag_to(world);
        }

        if response.drag_stopped() {
            self.controller.end_drag();
        }
    }

    pub(super) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_zoom_and_pan(ui, rect, &response);
        if self.controller.layout().dragging().is_none() {
            self.hovered = self.node_under_pointer(ui, rect);
        }
        self.handle_node_drag(ui, rect, &response);

        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        if self.live_layout && self.controller.tick(self.version, frame_delta_seconds) {
            ui.ctx().request_repaint();
        }

        let transform = self.controller.transform();
        draw_background(&painter, rect, transform.pan, transform.zoom);

        let visible = self.controller.visible();
        if visible.is_empty() {
            ui.put(rect, egui::Label::new("Nothing to show for the current view."));
            return;
        }

        let screen = self
            .controller
            .positions()
            .map(|(id, world)| (id, transform.world_to_screen(rect, world)))
            .collect::<HashMap<_, _>>();
        let node_radius = (NODE_RADIUS * transform.zoom).max(2.5);
        let zoom_sqrt = transform.zoom.sqrt();

        self.draw_cluster_overlay(&painter, rect, transform, &screen);

        let edge_stroke = Stroke::new(
            (1.1 * zoom_sqrt).clamp(0.6, 2.4),
            Color32::from_rgba_unmultiplied(150, 150, 150, 150),
        );
        let head_size = (7.0 * zoom_sqrt).clamp(4.0, 12.0);
        for link in &visible.links {
            let (Some(&start), Some(&end)) =
                (screen.get(link.source.as_str()), screen.get(link.target.as_str()))
            else {
                continue;
            };
            if !edge_visible(rect, start, end, head_size) {
                continue;
            }
            draw_arrow(&painter, start, end, node_radius, head_size, edge_stroke);
        }

        let focus = self.controller.focus_id();
        let matches = self
            .search_hits
            .iter()
            .map(|hit| hit.id.as_str())
            .collect::<HashSet<_>>();
        let show_all_labels = visible.nodes.len() <= LABEL_NODE_LIMIT || transform.zoom > 1.35;

        for node in &visible.nodes {
            let Some(&position) = screen.get(node.id.as_str()) else {
                continue;
            };
            if !circle_visible(rect, position, node_radius + 4.0) {
                continue;
            }

            let is_focus = focus == Some(node.id.as_str());
            let is_hovered = self.hovered.as_deref() == Some(node.id.as_str());
            let is_match = matches.contains(node.id.as_str());

            let base_color = kind_color(node.kind);
            let color = if !matches.is_empty() && !is_match && !is_focus {
                dim_color(base_color, 0.45)
            } else {
                base_color
            };
            let radius = if is_focus { node_radius * 1.6 } else { node_radius };

            painter.circle_filled(position, radius, color);
            let outline = if is_hovered || is_match {
                Stroke::new(2.0, Color32::from_rgb(245, 206, 93))
            } else {
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190))
            };
            painter.circle_stroke(position, radius, outline);

            if show_all_labels || is_focus || is_hovered || is_match {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    display_name(&node.id),
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }

        if let Some(hovered) = self.hovered.as_deref() {
            self.draw_hover_info(&painter, rect, hovered);
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        let pending_click = if response.clicked_by(egui::PointerButton::Primary) {
            self.hovered.clone()
        } else {
            None
        };
        if let Some(id) = pending_click
            && let Err(error) = self.controller.click(&id)
        {
            tracing::warn!(%error, "ignoring click");
        }
    }

    fn draw_cluster_overlay(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        transform: ViewTransform,
        screen: &HashMap<&str, Pos2>,
    ) {
        let visible = self.controller.visible();
        if visible.clusters.is_empty() {
            return;
        }

        let membership_stroke =
            Stroke::new(0.8, Color32::from_rgba_unmultiplied(120, 140, 170, 60));
        for link in &visible.membership_links {
            if let (Some(&start), Some(&end)) =
                (screen.get(link.source.as_str()), screen.get(link.target.as_str()))
                && edge_visible(rect, start, end, 1.0)
            {
                painter.line_segment([start, end], membership_stroke);
            }
        }

        let cluster_stroke = Stroke::new(
            (2.2 * transform.zoom.sqrt()).clamp(1.0, 4.0),
            Color32::from_rgba_unmultiplied(200, 170, 120, 140),
        );
        for edge in &visible.cluster_edges {
            if let (Some(&start), Some(&end)) =
                (screen.get(edge.source.as_str()), screen.get(edge.target.as_str()))
            {
                draw_arrow(painter, start, end, 0.0, 10.0, cluster_stroke);
            }
        }

        let per_member = self.controller.layout().config().cluster_radius_per_member;
        for cluster in &visible.clusters {
            let Some(&position) = screen.get(cluster.id.as_str()) else {
                continue;
            };
            let radius = ((12.0 + cluster.size as f32 * per_member) * transform.zoom).max(4.0);
            if !circle_visible(rect, position, radius) {
                continue;
            }
            painter.circle_filled(position, radius, cluster_color(cluster.community));
            painter.text(
                position,
                Align2::CENTER_CENTER,
                format!("{} ({})", cluster.id, cluster.size),
                FontId::proportional(11.0),
                Color32::from_gray(220),
            );
        }
    }

    fn draw_hover_info(&self, painter: &egui::Painter, rect: Rect, id: &str) {
        let text = match self.controller.cluster_node(id) {
            Some(cluster) => format!("{}  |  {} members", cluster.id, cluster.size),
            None => {
                let kind = NodeKind::from_id(id);
                let community = self
                    .controller
                    .communities()
                    .community_of(id)
                    .map(cluster_id)
                    .unwrap_or_else(|| "-".to_owned());
                format!(
                    "{}  |  {}  |  {}\n{}",
                    display_name(id),
                    kind.label(),
                    community,
                    id
                )
            }
        };

        painter.text(
            rect.left_top() + vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            text,
            FontId::proportional(13.0),
            Color32::from_gray(240),
        );
    }
}
