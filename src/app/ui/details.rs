use std::collections::BTreeMap;

use eframe::egui::{self, RichText, Ui};

use crate::engine::{Edge, EdgeKind, Node, Selection};

use super::super::{ObjectReport, Request, ViewModel};

fn format_created(millis: i64) -> String {
    let seconds = millis.div_euclid(1000);
    let days = seconds.div_euclid(86_400);
    let remainder = seconds.rem_euclid(86_400);
    format!(
        "day {days} since epoch, {:02}:{:02}:{:02} UTC",
        remainder / 3600,
        (remainder % 3600) / 60,
        remainder % 60
    )
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        match self.engine.selection().cloned() {
            Some(Selection::Node(id)) => match self.engine.node(&id) {
                Some(node) => self.draw_node_details(ui, node),
                None => {
                    ui.label("Selected node no longer exists in the graph.");
                }
            },
            Some(Selection::Edge(index)) => match self.engine.edges().get(index).cloned() {
                Some(edge) => self.draw_edge_details(ui, index, &edge),
                None => {
                    ui.label("Selected edge no longer exists in the graph.");
                }
            },
            None => {
                ui.label("Click a node or an edge to inspect it.");
            }
        }

        ui.separator();
        self.draw_report(ui);

        ui.separator();
        self.draw_fingerprint(ui);
    }

    /// Summary, time span and custody of the target object, fetched on demand.
    fn draw_report(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Object report").strong());
            if self.report_pending.is_some() {
                ui.spinner();
            }
        });

        if let Some(oid) = self.target_oid()
            && ui
                .add_enabled(self.report_pending.is_none(), egui::Button::new("Fetch report"))
                .on_hover_text(format!("Summary, time span and custody of {oid}"))
                .clicked()
        {
            self.requests.push(Request::Report(oid));
        }

        let Some(report) = &self.report else {
            return;
        };
        let mut open = None;
        draw_report_body(ui, report, &self.actors, &mut open);
        if let Some(oid) = open {
            self.oid_input = oid.clone();
            self.requests.push(Request::Load(oid));
        }
    }

    fn draw_node_details(&self, ui: &mut Ui, node: &Node) {
        ui.label(RichText::new(&node.label).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        egui::Grid::new("node_details")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                let row = |ui: &mut Ui, key: &str, value: String| {
                    ui.label(key);
                    ui.label(value);
                    ui.end_row();
                };
                row(ui, "type", node.kind.label().to_owned());
                if !node.subtype.is_empty() {
                    row(ui, "subtype", node.subtype.clone());
                }
                row(ui, "function", node.function.clone());
                let owner = match node.owner.as_deref() {
                    Some(owner) => match self.actors.get(owner) {
                        Some(name) => format!("{name} ({owner})"),
                        None => owner.to_owned(),
                    },
                    None => "unknown".to_owned(),
                };
                row(ui, "owner", owner);
                if let Some(created) = node.created {
                    row(ui, "created", format_created(created));
                }
                row(ui, "rank / order", format!("{} / {}", node.rank, node.order));
                row(ui, "tainted", if node.taint { "yes" } else { "no" }.to_owned());
                if node.tags.head || node.tags.foot || node.tags.more {
                    let tags = [
                        (node.tags.head, "head"),
                        (node.tags.foot, "foot"),
                        (node.tags.more, "more"),
                    ]
                    .iter()
                    .filter(|(set, _)| *set)
                    .map(|(_, name)| *name)
                    .collect::<Vec<_>>()
                    .join(", ");
                    row(ui, "tags", tags);
                }
            });

        let incoming = self.engine.index_of(&node.id).map_or(0, |index| {
            self.engine
                .edges()
                .iter()
                .filter(|edge| edge.directed().1 == index)
                .count()
        });
        ui.label(format!("Upstream links: {incoming}"));

        if !node.metadata.is_empty() {
            ui.separator();
            ui.label(RichText::new("Metadata").strong());
            egui::Grid::new("node_metadata")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    for (key, value) in &node.metadata {
                        ui.label(key);
                        ui.label(value.to_string());
                        ui.end_row();
                    }
                });
        }
    }

    fn draw_edge_details(&mut self, ui: &mut Ui, index: usize, edge: &Edge) {
        let name = |position: usize| {
            self.engine
                .nodes()
                .get(position)
                .map_or_else(|| "?".to_owned(), |node| node.label.clone())
        };
        let (tail, head) = edge.directed();
        ui.label(RichText::new(format!("{} -> {}", name(tail), name(head))).strong());
        if !edge.label.is_empty() {
            ui.small(edge.label.as_str());
        }
        ui.label(format!(
            "kind: {}",
            if edge.kind == EdgeKind::NonProvenance {
                "non-provenance"
            } else {
                "provenance"
            }
        ));

        ui.horizontal(|ui| {
            let mut result = Ok(());
            if ui.button("Both").clicked() {
                result = self.engine.set_edge_direction(index, true, true);
            }
            if ui.button("Left").clicked() {
                result = self.engine.set_edge_direction(index, true, false);
            }
            if ui.button("Right").clicked() {
                result = self.engine.set_edge_direction(index, false, true);
            }
            if ui.button("Delete").clicked() {
                result = self.engine.remove_edge(index);
            }
            if let Err(error) = result {
                self.edit_error = Some(error.to_string());
            }
        });
    }

    fn draw_fingerprint(&self, ui: &mut Ui) {
        ui.label(RichText::new("Graph fingerprint").strong());
        if self.fingerprint.is_empty() {
            ui.label("No statistics for this graph.");
            return;
        }

        egui::Grid::new("fingerprint")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for row in &self.fingerprint {
                    ui.label(&row.key);
                    ui.label(&row.value);
                    ui.end_row();
                }
            });
    }
}

fn draw_report_body(
    ui: &mut Ui,
    report: &ObjectReport,
    actors: &BTreeMap<String, String>,
    open: &mut Option<String>,
) {
    ui.small(report.oid.as_str());

    match &report.summary {
        Ok(summary) => {
            egui::Grid::new("object_summary")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    for (key, value) in [
                        ("name", &summary.name),
                        ("type", &summary.kind),
                        ("created", &summary.created),
                    ] {
                        ui.label(key);
                        ui.label(value.as_str());
                        ui.end_row();
                    }
                });
            ui.label(summary.summary.as_str());
        }
        Err(error) => {
            ui.small(format!("Unable to fetch summary: {error}"));
        }
    }

    match &report.span {
        Ok(span) => {
            ui.horizontal(|ui| {
                if ui.link("oldest").on_hover_text(span.oldest.as_str()).clicked() {
                    *open = Some(span.oldest.clone());
                }
                if ui.link("newest").on_hover_text(span.newest.as_str()).clicked() {
                    *open = Some(span.newest.clone());
                }
                ui.label(format!("time span: {}", span.description));
            });
        }
        Err(error) => {
            ui.small(format!("Unable to fetch time span: {error}"));
        }
    }

    ui.label("Chain of custody");
    match &report.custody {
        Ok(custody) if custody.is_empty() => {
            ui.small("No chain of custody or owner information available.");
        }
        Ok(custody) => {
            for custodian in custody {
                let name = if custodian.name.is_empty() {
                    actors.get(&custodian.aid).map_or(custodian.aid.as_str(), String::as_str)
                } else {
                    custodian.name.as_str()
                };
                ui.label(format!("- {name} / {}", custodian.kind));
            }
        }
        Err(error) => {
            ui.small(format!("Unable to fetch chain of custody: {error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_timestamps_are_readable() {
        assert_eq!(format_created(0), "day 0 since epoch, 00:00:00 UTC");
        assert_eq!(
            format_created(86_400_000 + 3_723_000),
            "day 1 since epoch, 01:02:03 UTC"
        );
    }
}
