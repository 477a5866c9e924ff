use egui::{Color32, RichText};
use egui_extras::{Column, TableBuilder};
use feira_marker_manager::kind_color;
use feira_marker_models::Coords;

use crate::{
    scene::{MapInteraction, MapScene},
    MapView,
};

/// Map for screens too small for the canvas: one row per marker, and a coordinate entry
/// that plays the role of a click on an empty spot of the map.
#[derive(Default)]
pub struct TableMapView {
    lat_text: String,
    lng_text: String,
    entry_error: Option<String>,
}

impl TableMapView {
    fn parse_entry(&self) -> Result<Coords, String> {
        let parse = |text: &str, name: &str| -> Result<f64, String> {
            text.trim()
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| format!("{name} inválida: '{text}'"))
        };
        let lat = parse(&self.lat_text, "latitude")?;
        let lng = parse(&self.lng_text, "longitude")?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err("coordenadas fora do mapa".to_string());
        }
        Ok(Coords::new(lat, lng))
    }
}

impl MapView for TableMapView {
    fn name(&self) -> &'static str {
        "table"
    }

    fn show(&mut self, ui: &mut egui::Ui, scene: &MapScene) -> Option<MapInteraction> {
        let mut interaction = None;

        ui.horizontal(|ui| {
            ui.label("lat");
            ui.add(egui::TextEdit::singleline(&mut self.lat_text).desired_width(90.0));
            ui.label("lng");
            ui.add(egui::TextEdit::singleline(&mut self.lng_text).desired_width(90.0));
            if ui.button("Adicionar").clicked() {
                match self.parse_entry() {
                    Ok(coords) => {
                        self.entry_error = None;
                        interaction = Some(MapInteraction::NewMarker(coords));
                    }
                    Err(e) => self.entry_error = Some(e),
                }
            }
        });
        if let Some(e) = &self.entry_error {
            ui.colored_label(Color32::RED, e);
        }

        if let Some((coords, cost)) = scene.optimal {
            ui.label(
                RichText::new(format!(
                    "Local ótimo: {coords} · custo {cost:.2} · {} rotas",
                    scene.routes.len()
                ))
                .strong(),
            );
        }
        ui.separator();

        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::remainder())
            .column(Column::auto())
            .header(20.0, |mut header| {
                for title in ["#", "tipo", "coordenadas", "quantidade", "frutas", ""] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for pin in scene.rows() {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            ui.label(format!("{}", pin.index + 1));
                        });
                        row.col(|ui| {
                            ui.colored_label(kind_color(pin.kind), pin.kind.as_ref());
                        });
                        row.col(|ui| {
                            if pin.coords.is_finite() {
                                ui.label(pin.coords.to_string());
                            } else {
                                ui.colored_label(Color32::RED, "sem coordenadas");
                            }
                        });
                        row.col(|ui| {
                            ui.label(pin.quantity.to_string());
                        });
                        row.col(|ui| {
                            ui.label(&pin.products);
                        });
                        row.col(|ui| {
                            if ui.small_button("editar").clicked() {
                                interaction = Some(MapInteraction::EditMarker(pin.index));
                            }
                        });
                    });
                }
            });

        interaction
    }
}
