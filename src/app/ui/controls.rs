use eframe::egui::{self, Color32, RichText, Ui};

use crate::engine::Phase;
use crate::fitness::Verdict;
use crate::prov::{MAX_HOPS, MAX_NODES, MIN_HOPS, MIN_NODES, TraversalDirection};

use super::super::{AssessorChoice, Request, ViewModel};

pub(in crate::app) fn verdict_color(verdict: Verdict) -> Color32 {
    match verdict {
        Verdict::Green => Color32::from_rgb(92, 184, 92),
        Verdict::Yellow => Color32::from_rgb(240, 200, 80),
        Verdict::Red => Color32::from_rgb(217, 83, 79),
        Verdict::None => Color32::from_gray(120),
    }
}

fn verdict_light(ui: &mut Ui, verdict: Verdict) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
    ui.painter()
        .circle_filled(rect.center(), 6.0, verdict_color(verdict));
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        self.draw_traversal_settings(ui);
        ui.separator();

        ui.label("Search (label or id)")
            .on_hover_text("Fuzzy-highlight matching nodes without changing the graph.");
        ui.text_edit_singleline(&mut self.search);
        ui.separator();

        self.draw_taint_controls(ui);
        ui.separator();

        self.draw_assessors(ui);
        ui.separator();

        self.draw_workflows(ui);
        ui.separator();

        ui.label(RichText::new("Editing").strong());
        ui.small("Ctrl-drag from one node to another to connect them.");
        ui.small("Delete removes the selected node or edge.");
        ui.small("B, L and R set the direction of the selected edge.");
    }

    fn draw_traversal_settings(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Traversal").strong());

        ui.add(egui::Slider::new(&mut self.settings.max_nodes, MIN_NODES..=MAX_NODES).text("max nodes"))
            .on_hover_text("Upper bound on objects fetched around the focus.");
        ui.add(egui::Slider::new(&mut self.settings.max_hops, MIN_HOPS..=MAX_HOPS).text("max hops"));

        egui::ComboBox::from_label("direction")
            .selected_text(self.settings.direction.name())
            .show_ui(ui, |ui| {
                for direction in TraversalDirection::ALL {
                    ui.selectable_value(&mut self.settings.direction, direction, direction.name());
                }
            });

        ui.checkbox(&mut self.settings.include_npes, "include non-provenance edges");
        ui.checkbox(&mut self.settings.follow_npids, "follow non-provenance ids");

        let busy = self.engine.phase().is_busy();
        if let Some(focus) = self.engine.focus().map(str::to_owned)
            && ui
                .add_enabled(!busy, egui::Button::new("Refetch with these settings"))
                .clicked()
        {
            self.requests.push(Request::Load(focus));
        }
    }

    fn draw_taint_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Taint").strong());

        let Some(oid) = self.target_oid() else {
            ui.label("Load a graph to mark objects as tainted.");
            return;
        };
        let target = self.engine.node(&oid);
        let tainted = target.is_some_and(|node| node.taint);
        let is_marker = target.is_some_and(|node| node.is_taint_marker());
        let in_graph = target.is_some();
        let busy = self.engine.phase().is_busy();

        ui.small(format!("target: {oid}"));
        ui.horizontal(|ui| {
            ui.label("reason");
            ui.text_edit_singleline(&mut self.taint_reason);
        });

        ui.horizontal(|ui| {
            let can_mark = !busy && !tainted && !self.taint_reason.trim().is_empty();
            if ui
                .add_enabled(can_mark, egui::Button::new("Mark tainted"))
                .on_disabled_hover_text("Needs a reason and an untainted target.")
                .clicked()
            {
                self.requests.push(Request::AddTaint {
                    oid: oid.clone(),
                    reason: self.taint_reason.trim().to_owned(),
                });
                self.taint_reason.clear();
            }

            let can_remove = !busy && (tainted || is_marker);
            if ui
                .add_enabled(can_remove, egui::Button::new("Remove taint"))
                .clicked()
            {
                self.requests.push(Request::RemoveTaint(oid.clone()));
            }
        });

        if ui
            .add_enabled(!busy && in_graph, egui::Button::new("Spread taint from target"))
            .on_hover_text("Taint the target and everything downstream of it, clearing other taint.")
            .clicked()
        {
            self.requests.push(Request::SpreadTaint(oid.clone()));
        }

        if let Phase::Editing(kind) = self.engine.phase() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(kind.describe());
            });
        }
    }

    fn draw_assessors(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Fitness").strong());
            if !self.assessors.is_empty() {
                verdict_light(ui, self.assessors.summary_verdict());
            }
        });

        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("new_assessor")
                .selected_text(self.new_assessor.title())
                .show_ui(ui, |ui| {
                    for choice in AssessorChoice::ALL {
                        ui.selectable_value(&mut self.new_assessor, choice, choice.title());
                    }
                });
            if self.new_assessor != AssessorChoice::Taint {
                ui.add(egui::TextEdit::singleline(&mut self.new_term).desired_width(90.0));
            }
            let ready =
                self.new_assessor == AssessorChoice::Taint || !self.new_term.trim().is_empty();
            if ui.add_enabled(ready, egui::Button::new("Add")).clicked() {
                self.assessors
                    .add(self.new_assessor.build(self.new_term.trim()));
                self.new_term.clear();
            }
        });

        let mut removed = Vec::new();
        let mut configured = Vec::new();
        for entry in self.assessors.entries() {
            ui.horizontal(|ui| {
                verdict_light(ui, entry.verdict);
                ui.label(entry.assessor.name());
                if entry.assessor.is_configurable() {
                    let edit = self
                        .term_edits
                        .entry(entry.id)
                        .or_insert_with(|| entry.assessor.term().unwrap_or_default().to_owned());
                    ui.add(egui::TextEdit::singleline(edit).desired_width(80.0));
                    if ui.small_button("Apply").clicked() {
                        configured.push((entry.id, edit.trim().to_owned()));
                    }
                }
                if ui.small_button("x").on_hover_text("Remove assessor").clicked() {
                    removed.push(entry.id);
                }
            })
            .response
            .on_hover_text(match (&entry.error, &entry.assessed) {
                (Some(error), _) => error.clone(),
                (None, Some(oid)) => format!("{} for {oid}", entry.verdict),
                (None, None) => entry.verdict.to_string(),
            });
        }

        for (id, term) in configured {
            self.assessors.configure(id, &term);
        }
        for id in removed {
            self.assessors.remove(id);
            self.term_edits.remove(&id);
        }

        if let Some(oid) = self.target_oid()
            && !self.assessors.is_empty()
            && ui.button("Assess target").clicked()
        {
            self.requests.push(Request::Assess(oid));
        }
    }

    fn draw_workflows(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Workflows").strong());
            if ui.small_button("Browse latest").clicked() {
                self.requests.push(Request::Workflows);
            }
        });

        let mut open = None;
        match &self.workflows {
            None => {}
            Some(Err(error)) => {
                ui.small(format!("Unable to list workflows: {error}"));
            }
            Some(Ok(workflows)) if workflows.is_empty() => {
                ui.small("No workflows reported yet.");
            }
            Some(Ok(workflows)) => {
                for workflow in workflows {
                    let hover = match workflow.created {
                        Some(created) => format!("{} (created {created})", workflow.oid),
                        None => workflow.oid.clone(),
                    };
                    if ui
                        .link(workflow.name.as_str())
                        .on_hover_text(hover)
                        .clicked()
                    {
                        open = Some(workflow.oid.clone());
                    }
                }
            }
        }

        if let Some(oid) = open {
            self.oid_input = oid.clone();
            self.requests.push(Request::Load(oid));
        }
    }
}
