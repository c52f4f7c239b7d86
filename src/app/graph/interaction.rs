use eframe::egui::{self, Key, Pos2, Rect, Ui};

use crate::engine::{EdgePath, Selection};

use super::super::ViewModel;
use super::super::render_utils::{distance_to_segment, screen_to_world, world_to_screen};

const EDGE_PICK_DISTANCE: f32 = 6.0;

/// What the pointer is over on the canvas.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum Hit {
    Node(usize),
    Edge(usize),
}

impl ViewModel {
    pub(super) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 4.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(super) fn handle_graph_pan(&mut self, response: &egui::Response, grabbed: bool) {
        let primary_on_empty = response.dragged_by(egui::PointerButton::Primary) && !grabbed;
        if primary_on_empty
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Closest node under the pointer, else the closest edge within a few
    /// pixels of it.
    pub(super) fn hit_test(
        pointer: Pos2,
        screen_positions: &[Pos2],
        radius: f32,
        edges: &[(usize, Pos2, Pos2)],
    ) -> Option<Hit> {
        let node = screen_positions
            .iter()
            .enumerate()
            .map(|(index, position)| (index, position.distance(pointer)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((index, _)) = node {
            return Some(Hit::Node(index));
        }

        edges
            .iter()
            .map(|(index, start, end)| (*index, distance_to_segment(pointer, *start, *end)))
            .filter(|(_, distance)| *distance <= EDGE_PICK_DISTANCE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| Hit::Edge(index))
    }

    pub(super) fn apply_click(&mut self, hit: Option<&Hit>) {
        match hit {
            Some(Hit::Node(index)) => {
                if let Some(id) = self.engine.nodes().get(*index).map(|node| node.id.clone()) {
                    self.engine.select_node(&id);
                }
            }
            Some(Hit::Edge(index)) => self.engine.select_edge(*index),
            None => self.engine.clear_selection(),
        }
    }

    /// Primary drags on a node move it; with ctrl held they draw a new edge
    /// that is created when released over another node.
    pub(super) fn handle_node_drag(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        hit: Option<&Hit>,
    ) -> bool {
        let hovered_id = match hit {
            Some(Hit::Node(index)) => self.engine.nodes().get(*index).map(|node| node.id.clone()),
            _ => None,
        };

        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(id) = hovered_id.clone()
        {
            if ui.input(|input| input.modifiers.ctrl) {
                self.link_from = Some(id);
            } else if let Err(error) = self.engine.drag_node(&id, self.node_world_position(&id)) {
                self.edit_error = Some(error.to_string());
            }
        }

        if response.dragged_by(egui::PointerButton::Primary)
            && self.link_from.is_none()
            && let Some(id) = self.engine.dragging().map(str::to_owned)
            && let Some(pointer) = response.interact_pointer_pos()
        {
            let world = screen_to_world(rect, self.pan, self.zoom, pointer);
            if let Err(error) = self.engine.drag_node(&id, world) {
                self.edit_error = Some(error.to_string());
            }
        }

        if response.drag_stopped() {
            if let Some(from) = self.link_from.take()
                && let Some(to) = hovered_id
                && from != to
            {
                match self.engine.add_edge(&from, &to) {
                    Ok(index) => self.engine.select_edge(index),
                    Err(error) => self.edit_error = Some(error.to_string()),
                }
            }
            self.engine.end_drag();
        }

        self.link_from.is_some() || self.engine.dragging().is_some()
    }

    /// Delete removes the selection; B, L and R point the selected edge both
    /// ways, backwards or forwards.
    pub(super) fn handle_edit_keys(&mut self, ui: &Ui) {
        if ui.ctx().wants_keyboard_input() || self.engine.selection().is_none() {
            return;
        }

        let (delete, both, left, right) = ui.input(|input| {
            (
                input.key_pressed(Key::Delete) || input.key_pressed(Key::Backspace),
                input.key_pressed(Key::B),
                input.key_pressed(Key::L),
                input.key_pressed(Key::R),
            )
        });

        let result = if delete {
            self.engine.remove_selection()
        } else if !matches!(self.engine.selection(), Some(Selection::Edge(_))) {
            Ok(())
        } else if both {
            self.engine.direct_selected_edge(true, true)
        } else if left {
            self.engine.direct_selected_edge(true, false)
        } else if right {
            self.engine.direct_selected_edge(false, true)
        } else {
            Ok(())
        };

        if let Err(error) = result {
            self.edit_error = Some(error.to_string());
        }
    }

    pub(super) fn link_preview(&self, rect: Rect, pointer: Option<Pos2>) -> Option<(Pos2, Pos2)> {
        let from = self.link_from.as_deref()?;
        let start = world_to_screen(rect, self.pan, self.zoom, self.node_world_position(from));
        Some((start, pointer?))
    }

    fn node_world_position(&self, id: &str) -> egui::Vec2 {
        self.engine
            .node(id)
            .map(|node| node.position)
            .unwrap_or_default()
    }

    pub(super) fn screen_edges(
        &self,
        rect: Rect,
        paths: &[EdgePath],
    ) -> Vec<(usize, Pos2, Pos2)> {
        paths
            .iter()
            .map(|path| {
                (
                    path.edge,
                    world_to_screen(rect, self.pan, self.zoom, path.start),
                    world_to_screen(rect, self.pan, self.zoom, path.end),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    #[test]
    fn nodes_win_over_edges() {
        let positions = [pos2(0.0, 0.0), pos2(100.0, 0.0)];
        let edges = [(0, pos2(10.0, 0.0), pos2(90.0, 0.0))];

        assert_eq!(
            ViewModel::hit_test(pos2(3.0, 2.0), &positions, 10.0, &edges),
            Some(Hit::Node(0))
        );
        assert_eq!(
            ViewModel::hit_test(pos2(50.0, 4.0), &positions, 10.0, &edges),
            Some(Hit::Edge(0))
        );
        assert_eq!(ViewModel::hit_test(pos2(50.0, 40.0), &positions, 10.0, &edges), None);
    }

    #[test]
    fn closest_node_is_picked() {
        let positions = [pos2(0.0, 0.0), pos2(8.0, 0.0)];
        assert_eq!(
            ViewModel::hit_test(pos2(6.0, 0.0), &positions, 10.0, &[]),
            Some(Hit::Node(1))
        );
    }
}
