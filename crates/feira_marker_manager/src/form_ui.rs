use egui::{Color32, RichText, Window};
use feira_marker_models::MarkerKind;
use tracing::trace;

use crate::form::{FormOutcome, MarkerForm, SUGGESTION_LIMIT};

pub fn kind_color(kind: MarkerKind) -> Color32 {
    match kind {
        MarkerKind::Mercado => Color32::from_rgb(0x1e, 0x88, 0xe5),
        MarkerKind::Produtor => Color32::from_rgb(0x43, 0xa0, 0x47),
    }
}

/// Draws the form and returns what the user chose, if anything, this frame.
/// `error` holds the last save failure and is shown until the next attempt.
pub fn marker_form_window(
    ctx: &egui::Context,
    form: &mut MarkerForm,
    error: &mut Option<String>,
) -> Option<FormOutcome> {
    let mut outcome = None;
    let mut is_open = true;
    let title = match form.index() {
        Some(index) => format!("Marcador {}", index + 1),
        None => "Novo marcador".to_string(),
    };
    Window::new(title)
        .id(egui::Id::new("marker form"))
        .collapsible(false)
        .resizable(false)
        .open(&mut is_open)
        .show(ctx, |ui| {
            egui::Grid::new("marker form grid")
                .num_columns(2)
                .show(ui, |ui| {
                    ui.label("Tipo");
                    ui.horizontal(|ui| {
                        for kind in [MarkerKind::Mercado, MarkerKind::Produtor] {
                            let text = RichText::new(kind.as_ref()).color(kind_color(kind));
                            if ui.selectable_label(form.kind == kind, text).clicked() {
                                form.set_kind(kind);
                            }
                        }
                    });
                    ui.end_row();

                    ui.label("Coordenadas");
                    match form.coords {
                        Some(coords) => ui.label(coords.to_string()),
                        None => ui.colored_label(Color32::RED, "sem coordenadas"),
                    };
                    ui.end_row();

                    ui.label("Quantidade");
                    ui.text_edit_singleline(&mut form.quantity_text);
                    ui.end_row();

                    ui.label("Frutas");
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut form.query).hint_text("buscar fruta"),
                    );
                    ui.end_row();

                    let suggestions = form.suggestions(SUGGESTION_LIMIT);
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        if let Some(first) = suggestions.first() {
                            form.add_product(first);
                        }
                    }
                    if !suggestions.is_empty() {
                        ui.label("");
                        ui.horizontal_wrapped(|ui| {
                            for suggestion in suggestions {
                                if ui.small_button(suggestion).clicked() {
                                    trace!(suggestion, "product picked");
                                    form.add_product(suggestion);
                                }
                            }
                        });
                        ui.end_row();
                    }
                });

            ui.separator();
            let mut to_remove = None;
            ui.horizontal_wrapped(|ui| {
                if form.products().is_empty() {
                    ui.weak("nenhuma fruta");
                }
                for product in form.products() {
                    if ui
                        .button(format!("{product} ✖"))
                        .on_hover_text("remover")
                        .clicked()
                    {
                        to_remove = Some(product.clone());
                    }
                }
            });
            if let Some(product) = to_remove {
                form.remove_product(&product);
            }

            if let Some(message) = error.as_ref() {
                ui.colored_label(Color32::RED, message);
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Salvar").clicked() {
                    match form.save() {
                        Ok(saved) => {
                            *error = None;
                            outcome = Some(saved);
                        }
                        Err(e) => {
                            *error = Some(e.to_string());
                        }
                    }
                }
                if !form.is_new() && ui.button("Excluir").clicked() {
                    outcome = Some(form.delete());
                }
                if ui.button("Cancelar").clicked() {
                    outcome = Some(form.cancel());
                }
            });
        });
    if !is_open && outcome.is_none() {
        outcome = Some(form.cancel());
    }
    outcome
}
