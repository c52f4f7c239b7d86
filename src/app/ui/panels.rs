use eframe::egui::{self, Align, Color32, Context, Layout, RichText};

use crate::engine::{ClusterDimension, Phase};

use super::super::{Request, ViewModel};

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context, server: &str) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("prov-vis");
                    ui.separator();

                    ui.label("Object:");
                    let input = ui.add(
                        egui::TextEdit::singleline(&mut self.oid_input)
                            .hint_text("urn:uuid:...")
                            .desired_width(260.0),
                    );
                    let submitted =
                        input.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
                    let busy = self.engine.phase().is_busy();
                    let load = ui.add_enabled(
                        !busy && !self.oid_input.trim().is_empty(),
                        egui::Button::new("Load"),
                    );
                    if (load.clicked() || submitted) && !busy {
                        let oid = self.oid_input.trim().to_owned();
                        if !oid.is_empty() {
                            self.requests.push(Request::Load(oid));
                        }
                    }

                    ui.separator();
                    let mut dimension = self.engine.dimension();
                    egui::ComboBox::from_id_salt("cluster_dimension")
                        .selected_text(dimension.title())
                        .show_ui(ui, |ui| {
                            for option in ClusterDimension::ALL {
                                ui.selectable_value(&mut dimension, option, option.title());
                            }
                        })
                        .response
                        .on_hover_text("Attribute nodes are pulled together by.");
                    if dimension != self.engine.dimension() {
                        self.engine.change_force(dimension);
                    }
                    let groups = self.engine.forces().values(dimension).len();
                    if groups > 0 {
                        ui.small(format!("{groups} groups"));
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!(
                            "nodes: {}  edges: {}  tainted: {}",
                            self.engine.nodes().len(),
                            self.engine.edges().len(),
                            self.engine.taint_count()
                        ));
                        ui.small(server);
                        if self.engine.is_simulating() {
                            let simulation = self.engine.simulation();
                            ui.small(format!(
                                "alpha {:.3}  tick {}",
                                simulation.alpha(),
                                simulation.ticks()
                            ));
                        }
                    });
                });
            });

        self.draw_error_banner(ctx);

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_details(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.engine.phase().clone() {
            Phase::Loading { oid } if self.engine.is_empty() => self.draw_loading(ui, &oid),
            _ if self.engine.is_empty() => self.draw_empty(ui),
            _ => self.draw_graph(ui),
        });
    }

    /// Fetch and edit failures from the engine plus rejected local edits.
    fn draw_error_banner(&mut self, ctx: &Context) {
        let remote = match self.engine.phase() {
            Phase::Error(message) => Some(message.clone()),
            _ => None,
        };
        if remote.is_none() && self.edit_error.is_none() {
            return;
        }

        egui::TopBottomPanel::top("error_banner").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                if let Some(message) = &remote {
                    ui.label(RichText::new(message).color(Color32::from_rgb(240, 110, 100)));
                    if let Some(focus) = self.engine.focus().map(str::to_owned)
                        && ui.button("Retry").clicked()
                    {
                        self.requests.push(Request::Load(focus));
                    }
                    if ui.button("Dismiss").clicked() {
                        self.engine.dismiss_error();
                    }
                }
                if let Some(message) = self.edit_error.clone() {
                    ui.label(RichText::new(message).color(Color32::from_rgb(235, 180, 90)));
                    if ui.button("Dismiss").clicked() {
                        self.edit_error = None;
                    }
                }
            });
        });
    }
}
