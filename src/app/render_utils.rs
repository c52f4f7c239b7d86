use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::engine::{Canvas, Node, NodeKind};

pub(super) const TAINT_COLOR: Color32 = Color32::from_rgb(214, 72, 72);
pub(super) const NPE_COLOR: Color32 = Color32::from_rgb(92, 150, 235);
pub(super) const EDGE_COLOR: Color32 = Color32::from_rgb(150, 156, 166);
pub(super) const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
pub(super) const MATCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
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

/// Fill for a node before selection and search highlighting.
pub(super) fn node_color(node: &Node) -> Color32 {
    if node.taint {
        return TAINT_COLOR;
    }
    match node.kind {
        NodeKind::Data => Color32::from_rgb(76, 138, 196),
        NodeKind::Invocation => Color32::from_rgb(110, 168, 112),
        NodeKind::Marking => Color32::from_rgb(231, 148, 72),
        NodeKind::NonProvenance => Color32::from_rgb(120, 120, 132),
        NodeKind::Workflow | NodeKind::Activity | NodeKind::Other(_) => {
            Color32::from_rgb(150, 128, 186)
        }
    }
}

/// Paints the canvas area plus a grid that follows pan and zoom.
pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32, canvas: Canvas) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let top_left = world_to_screen(rect, pan, zoom, Vec2::ZERO);
    let bottom_right = world_to_screen(rect, pan, zoom, canvas.size());
    painter.rect_filled(
        Rect::from_two_pos(top_left, bottom_right),
        4.0,
        Color32::from_rgb(25, 30, 38),
    );

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

/// Screen distance from `point` to the segment `start..end`.
pub(super) fn distance_to_segment(point: Pos2, start: Pos2, end: Pos2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq <= f32::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// Triangle with its tip at `tip`, pointing along `direction`.
pub(super) fn arrow_head(tip: Pos2, direction: Vec2, size: f32) -> Vec<Pos2> {
    let direction = direction.normalized();
    let normal = direction.rot90();
    let base = tip - direction * size;
    vec![tip, base + normal * (size * 0.5), base - normal * (size * 0.5)]
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

/// Zoom and pan that fit the whole canvas into `rect`.
pub(super) fn fit_canvas(rect: Rect, canvas: Canvas) -> (Vec2, f32) {
    let size = canvas.size();
    let zoom = (rect.width() / size.x)
        .min(rect.height() / size.y)
        .clamp(0.05, 2.0)
        * 0.95;
    (-(size * 0.5) * zoom, zoom)
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn screen_and_world_transforms_are_inverse() {
        let rect = Rect::from_min_size(pos2(10.0, 20.0), vec2(800.0, 600.0));
        let world = vec2(321.0, -45.0);
        let screen = world_to_screen(rect, vec2(15.0, -7.0), 0.4, world);
        let back = screen_to_world(rect, vec2(15.0, -7.0), 0.4, screen);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let start = pos2(0.0, 0.0);
        let end = pos2(10.0, 0.0);
        assert_eq!(distance_to_segment(pos2(5.0, 3.0), start, end), 3.0);
        assert_eq!(distance_to_segment(pos2(14.0, 3.0), start, end), 5.0);
        assert_eq!(distance_to_segment(pos2(1.0, 1.0), start, start), 2f32.sqrt());
    }

    #[test]
    fn fitted_canvas_is_centred() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(1000.0, 500.0));
        let canvas = Canvas::for_node_count(0);
        let (pan, zoom) = fit_canvas(rect, canvas);
        let centre = world_to_screen(rect, pan, zoom, canvas.size() * 0.5);
        assert!((centre - rect.center()).length() < 1e-3);
        assert!(canvas.size().x * zoom <= rect.width());
    }

    #[test]
    fn tainted_nodes_use_the_taint_colour() {
        let mut node = Node::new("a", NodeKind::Data, "a");
        assert_ne!(node_color(&node), TAINT_COLOR);
        node.taint = true;
        assert_eq!(node_color(&node), TAINT_COLOR);
    }
}
