//! The overlay panel listing the candidates of the selected ward.

use egui::{Align2, Color32, Label, Margin, RichText, Sense, Ui};

use crate::roster::Candidate;

/// What the panel is showing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelState {
    /// Only the title.
    #[default]
    Collapsed,
    /// The title and the candidate list, with at most one candidate's details open.
    Expanded {
        /// Index of the candidate whose details are shown.
        open_detail: Option<usize>,
    },
}

/// Title plus roster, with collapse/expand and per-candidate details.
///
/// The panel is invisible until the first [`InfoPanel::update`].
#[derive(Clone, Debug, Default)]
pub struct InfoPanel {
    title: Option<String>,
    candidates: Vec<Candidate>,
    state: PanelState,
}

impl InfoPanel {
    /// Creates a collapsed panel with nothing to show.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the content and collapses the panel.
    pub fn update(&mut self, title: impl Into<String>, candidates: Vec<Candidate>) {
        self.title = Some(title.into());
        self.candidates = candidates;
        self.state = PanelState::Collapsed;
    }

    /// Flips between collapsed and expanded. Expanding never opens a detail.
    pub fn toggle(&mut self) {
        self.state = match self.state {
            PanelState::Collapsed => PanelState::Expanded { open_detail: None },
            PanelState::Expanded { .. } => PanelState::Collapsed,
        };
    }

    /// Opens the details of candidate `index`, or closes them if already open.
    ///
    /// Ignored while collapsed or when `index` is out of range.
    pub fn select(&mut self, index: usize) {
        if index >= self.candidates.len() {
            return;
        }
        if let PanelState::Expanded { open_detail } = &mut self.state {
            *open_detail = if *open_detail == Some(index) {
                None
            } else {
                Some(index)
            };
        }
    }

    /// The current state.
    pub fn state(&self) -> PanelState {
        self.state
    }

    /// The title, once the panel has been updated.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The listed candidates.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Draws the panel in the top right corner. Clicking the title toggles the list and
    /// clicking a candidate toggles its details.
    pub fn show(&mut self, ctx: &egui::Context) {
        let Some(title) = self.title.as_deref() else {
            return;
        };

        let mut title_clicked = false;
        let mut candidate_clicked = None;

        egui::Area::new(egui::Id::new("ward_info_panel"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
            .show(ctx, |ui| {
                let bg_color = if ui.visuals().dark_mode {
                    Color32::from_black_alpha(200)
                } else {
                    Color32::from_white_alpha(220)
                };

                egui::Frame::NONE
                    .inner_margin(Margin::same(8))
                    .fill(bg_color)
                    .corner_radius(4.0)
                    .show(ui, |ui| {
                        ui.set_max_width(280.0);

                        let heading = Label::new(RichText::new(title).strong()).sense(Sense::click());
                        title_clicked = ui.add(heading).clicked();

                        let PanelState::Expanded { open_detail } = self.state else {
                            return;
                        };

                        ui.separator();
                        if self.candidates.is_empty() {
                            ui.label("No candidates registered.");
                        }
                        for (i, candidate) in self.candidates.iter().enumerate() {
                            let text = if candidate.incumbent {
                                format!("{} (incumbent)", candidate.name)
                            } else {
                                candidate.name.clone()
                            };
                            if ui.add(Label::new(text).sense(Sense::click())).clicked() {
                                candidate_clicked = Some(i);
                            }
                            if open_detail == Some(i) {
                                ui.indent(("candidate_detail", i), |ui| {
                                    candidate_details(ui, i, candidate)
                                });
                            }
                        }
                    });
            });

        if title_clicked {
            self.toggle();
        }
        if let Some(i) = candidate_clicked {
            self.select(i);
        }
    }
}

fn candidate_details(ui: &mut Ui, index: usize, candidate: &Candidate) {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    egui::Grid::new(("candidate_grid", index))
        .num_columns(2)
        .show(ui, |ui| {
            ui.label("Nominated");
            ui.label(text(&candidate.nomination_date));
            ui.end_row();

            ui.label("Incumbent");
            ui.label(if candidate.incumbent { "Yes" } else { "No" });
            ui.end_row();

            ui.label("Email");
            ui.label(text(&candidate.email));
            ui.end_row();

            ui.label("Website");
            match &candidate.website {
                Some(url) => ui.hyperlink(url),
                None => ui.label(""),
            };
            ui.end_row();

            ui.label("Phone");
            ui.label(text(&candidate.phone));
            ui.end_row();
        });
}
