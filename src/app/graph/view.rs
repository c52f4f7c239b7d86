use std::collections::HashSet;

use eframe::egui::{
    self, Align2, Color32, CornerRadius, FontId, Rect, Sense, Shape, Stroke, StrokeKind, Ui,
    vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::engine::{NODE_SIZE, Node, NodeKind, Selection};
use crate::util::truncate_label;

use super::super::ViewModel;
use super::super::render_utils::{
    EDGE_COLOR, MATCH_COLOR, NPE_COLOR, SELECTED_COLOR, arrow_head, blend_color, circle_visible,
    dim_color, draw_background, edge_visible, fit_canvas, node_color, world_to_screen,
};
use super::interaction::Hit;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Indices of nodes whose label or id fuzzy-matches `query`.
pub(in crate::app) fn search_matches(nodes: &[Node], query: &str) -> HashSet<usize> {
    let query = query.trim();
    if query.is_empty() {
        return HashSet::new();
    }

    let matcher = SkimMatcherV2::default();
    nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| {
            fuzzy_match_score(&matcher, &node.label, query).is_some()
                || fuzzy_match_score(&matcher, &node.id, query).is_some()
        })
        .map(|(index, _)| index)
        .collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if self.fit_pending {
            (self.pan, self.zoom) = fit_canvas(rect, self.engine.canvas());
            self.fit_pending = false;
        }

        let moving = self.engine.tick();

        draw_background(&painter, rect, self.pan, self.zoom, self.engine.canvas());
        self.handle_graph_zoom(ui, rect, &response);

        let frame = self.engine.frame();
        let screen_positions = frame
            .positions
            .iter()
            .map(|position| world_to_screen(rect, self.pan, self.zoom, *position))
            .collect::<Vec<_>>();
        let radius = (NODE_SIZE * self.zoom).max(3.0);
        let screen_edges = self.screen_edges(rect, &frame.edges);

        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hit = pointer
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| Self::hit_test(pointer, &screen_positions, radius, &screen_edges));

        if response.clicked_by(egui::PointerButton::Primary) {
            self.apply_click(hit.as_ref());
        }
        let grabbed = self.handle_node_drag(ui, rect, &response, hit.as_ref());
        self.handle_graph_pan(&response, grabbed);
        self.handle_edit_keys(ui);

        if hit.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if moving || grabbed || response.dragged() {
            ui.ctx().request_repaint();
        }

        // edits above may have changed the arrays; draw what is current now
        if self.engine.nodes().len() != screen_positions.len() {
            ui.ctx().request_repaint();
            return;
        }

        let matches = search_matches(self.engine.nodes(), &self.search);
        let search_active = !matches.is_empty();
        let selected_node = match self.engine.selection() {
            Some(Selection::Node(id)) => self.engine.index_of(id),
            _ => None,
        };
        let selected_edge = match self.engine.selection() {
            Some(Selection::Edge(index)) => Some(*index),
            _ => None,
        };

        let zoom_sqrt = self.zoom.sqrt();
        for (path, (index, start, end)) in frame.edges.iter().zip(&screen_edges) {
            if !edge_visible(rect, *start, *end, 4.0) {
                continue;
            }

            let is_selected = selected_edge == Some(*index);
            let is_hovered = hit == Some(Hit::Edge(*index));
            let base = if path.non_provenance { NPE_COLOR } else { EDGE_COLOR };
            let color = if is_selected {
                SELECTED_COLOR
            } else if is_hovered {
                blend_color(base, Color32::WHITE, 0.4)
            } else if search_active {
                dim_color(base, 0.5)
            } else {
                base
            };
            let width = if is_selected { 3.0 } else { 1.6 } * zoom_sqrt.clamp(0.6, 1.6);
            let stroke = Stroke::new(width, color);

            if path.non_provenance {
                painter.extend(Shape::dashed_line(&[*start, *end], stroke, 8.0, 5.0));
            } else {
                painter.line_segment([*start, *end], stroke);
            }

            let arrow_size = (14.0 * self.zoom).clamp(5.0, 18.0);
            if path.end_arrow {
                painter.add(Shape::convex_polygon(
                    arrow_head(*end, *end - *start, arrow_size),
                    color,
                    Stroke::NONE,
                ));
            }
            if path.start_arrow {
                painter.add(Shape::convex_polygon(
                    arrow_head(*start, *start - *end, arrow_size),
                    color,
                    Stroke::NONE,
                ));
            }
        }

        if let Some((start, end)) = self.link_preview(rect, pointer) {
            painter.extend(Shape::dashed_line(
                &[start, end],
                Stroke::new(1.5, SELECTED_COLOR),
                6.0,
                4.0,
            ));
        }

        for (index, node) in self.engine.nodes().iter().enumerate() {
            let position = screen_positions[index];
            if !circle_visible(rect, position, radius) {
                continue;
            }

            let is_selected = selected_node == Some(index);
            let is_hovered = hit == Some(Hit::Node(index));
            let is_match = matches.contains(&index);

            let base = node_color(node);
            let fill = if is_selected {
                blend_color(base, SELECTED_COLOR, 0.55)
            } else if is_hovered {
                blend_color(base, Color32::WHITE, 0.25)
            } else if is_match {
                blend_color(base, MATCH_COLOR, 0.6)
            } else if search_active {
                dim_color(base, 0.45)
            } else {
                base
            };
            let outline = Stroke::new(
                if is_selected || is_match { 2.5 } else { 1.0 },
                if is_selected {
                    SELECTED_COLOR
                } else {
                    Color32::from_rgba_unmultiplied(15, 15, 15, 190)
                },
            );

            if node.kind == NodeKind::Data {
                painter.circle_filled(position, radius, fill);
                painter.circle_stroke(position, radius, outline);
            } else {
                let node_rect = Rect::from_center_size(position, vec2(radius * 2.0, radius * 1.4));
                let rounding = CornerRadius::same((radius * 0.3).clamp(2.0, 20.0) as u8);
                painter.rect_filled(node_rect, rounding, fill);
                painter.rect_stroke(node_rect, rounding, outline, StrokeKind::Outside);
            }

            if radius > 12.0 || is_selected || is_hovered || is_match {
                painter.text(
                    position,
                    Align2::CENTER_CENTER,
                    truncate_label(&node.label),
                    FontId::proportional((11.0 * zoom_sqrt).clamp(9.0, 16.0)),
                    Color32::from_gray(240),
                );
            }
        }

        if let Some(Hit::Node(index)) = hit
            && let Some(node) = self.engine.nodes().get(index)
        {
            self.draw_hover_text(&painter, rect, node);
        }
    }

    fn draw_hover_text(&self, painter: &egui::Painter, rect: Rect, node: &Node) {
        let owner = node
            .owner
            .as_deref()
            .map(|owner| self.actors.get(owner).map_or(owner, String::as_str))
            .unwrap_or("no owner");
        let panel_text = format!(
            "{}  |  {}  |  {}  |  {}{}",
            node.label,
            node.kind.label(),
            node.function,
            owner,
            if node.taint { "  |  tainted" } else { "" }
        );
        painter.text(
            rect.left_top() + vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            panel_text,
            FontId::proportional(13.0),
            Color32::from_gray(240),
        );
    }

    pub(in crate::app) fn draw_loading(&self, ui: &mut Ui, oid: &str) {
        ui.vertical_centered(|ui| {
            ui.add_space(120.0);
            ui.heading(format!("Fetching lineage of {oid}..."));
            ui.add_space(8.0);
            ui.spinner();
        });
    }

    pub(in crate::app) fn draw_empty(&self, ui: &mut Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(120.0);
            ui.heading("No graph loaded");
            ui.label("Enter an object id above and press Load.");
        });
    }
}
