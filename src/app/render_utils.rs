use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use nix_drv_graph::graph::NodeKind;

pub(super) fn kind_color(kind: NodeKind) -> Color32 {
    match kind {
        NodeKind::Derivation => Color32::from_rgb(0x4C, 0xAF, 0x50),
        NodeKind::Patch => Color32::from_rgb(0xFF, 0xA7, 0x26),
        NodeKind::Script => Color32::from_rgb(0x9C, 0x27, 0xB0),
        NodeKind::Other => Color32::from_rgb(0x21, 0x96, 0xF3),
    }
}

pub(super) fn cluster_color(community: usize) -> Color32 {
    const PALETTE: [Color32; 6] = [
        Color32::from_rgba_premultiplied(70, 110, 160, 90),
        Color32::from_rgba_premultiplied(150, 90, 60, 90),
        Color32::from_rgba_premultiplied(80, 140, 90, 90),
        Color32::from_rgba_premultiplied(140, 80, 140, 90),
        Color32::from_rgba_premultiplied(150, 140, 60, 90),
        Color32::from_rgba_premultiplied(60, 140, 140, 90),
    ];
    PALETTE[community % PALETTE.len()]
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

/// Directed edge that stops at the target's rim, with an arrowhead there.
pub(super) fn draw_arrow(
    painter: &Painter,
    start: Pos2,
    end: Pos2,
    target_radius: f32,
    head_size: f32,
    stroke: Stroke,
) {
    let delta = end - start;
    let length = delta.length();
    if length <= target_radius + 0.5 {
        return;
    }

    let direction = delta / length;
    let tip = end - direction * target_radius;
    painter.line_segment([start, tip], stroke);

    let normal = Vec2::new(-direction.y, direction.x);
    let base = tip - direction * head_size;
    let left = base + normal * (head_size * 0.5);
    let right = base - normal * (head_size * 0.5);
    painter.add(eframe::egui::Shape::convex_polygon(
        vec![tip, left, right],
        stroke.color,
        Stroke::NONE,
    ));
}
