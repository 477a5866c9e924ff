use egui::{Align2, Color32, FontId, Pos2, Rect, RichText, Sense, Shape, Stroke, Vec2};
use feira_marker_manager::kind_color;
use feira_marker_models::Coords;
use tracing::trace;

use crate::{
    scene::{MapInteraction, MapScene},
    viewport::Viewport,
    MapView,
};

const PIN_RADIUS: f32 = 7.0;
const HIT_RADIUS: f32 = 12.0;
const OPTIMAL_RADIUS: f32 = 10.0;
const BACKGROUND: Color32 = Color32::from_rgb(0xee, 0xf2, 0xe6);
const GRID: Color32 = Color32::from_rgb(0xd0, 0xd6, 0xc8);
const ROUTE: Color32 = Color32::from_rgb(0xe5, 0x39, 0x35);
const OPTIMAL: Color32 = Color32::from_rgb(0xff, 0x8f, 0x00);

/// Interactive map: drag to pan, ctrl+scroll or pinch to zoom, click to add or edit a marker.
/// There are no tiles, only a graticule under the markers.
pub struct CanvasMapView {
    pub viewport: Viewport,
    fit_requested: bool,
}

impl CanvasMapView {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            fit_requested: false,
        }
    }

    /// Degrees between two graticule lines, so that lines stay roughly 100 points apart.
    fn grid_step(&self, rect: Rect) -> f64 {
        let left = self.viewport.unproject(rect.left_center(), rect).lng;
        let right = self
            .viewport
            .unproject(rect.left_center() + Vec2::new(100.0, 0.0), rect)
            .lng;
        let wanted = (right - left).abs().max(1e-6);
        [0.001, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 45.0]
            .into_iter()
            .find(|step| *step >= wanted)
            .unwrap_or(90.0)
    }

    fn paint_grid(&self, painter: &egui::Painter, rect: Rect) {
        let step = self.grid_step(rect);
        let top_left = self.viewport.unproject(rect.left_top(), rect);
        let bottom_right = self.viewport.unproject(rect.right_bottom(), rect);
        let stroke = Stroke::new(1.0, GRID);

        let mut lng = (top_left.lng / step).floor() * step;
        while lng <= bottom_right.lng {
            let x = self.viewport.project(Coords::new(top_left.lat, lng), rect).x;
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
            lng += step;
        }
        let mut lat = (bottom_right.lat / step).floor() * step;
        while lat <= top_left.lat {
            let y = self.viewport.project(Coords::new(lat, top_left.lng), rect).y;
            painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
            lat += step;
        }
    }

    fn paint_scene(&self, painter: &egui::Painter, rect: Rect, scene: &MapScene) {
        for route in &scene.routes {
            let points: Vec<Pos2> = route
                .iter()
                .filter(|c| c.is_finite())
                .map(|c| self.viewport.project(*c, rect))
                .collect();
            if points.len() > 1 {
                painter.add(Shape::line(points, Stroke::new(2.5, ROUTE)));
            }
        }

        let font = FontId::proportional(12.0);
        for pin in &scene.pins {
            let pos = self.viewport.project(pin.coords, rect);
            if !rect.expand(PIN_RADIUS).contains(pos) {
                continue;
            }
            painter.circle(pos, PIN_RADIUS, kind_color(pin.kind), Stroke::new(1.5, Color32::WHITE));
            painter.text(
                pos + Vec2::new(PIN_RADIUS + 2.0, 0.0),
                Align2::LEFT_CENTER,
                &pin.label,
                font.clone(),
                Color32::BLACK,
            );
        }

        if let Some((coords, cost)) = scene.optimal {
            let pos = self.viewport.project(coords, rect);
            painter.circle(pos, OPTIMAL_RADIUS, OPTIMAL, Stroke::new(2.0, Color32::BLACK));
            painter.circle_filled(pos, 3.0, Color32::BLACK);
            painter.text(
                pos + Vec2::new(0.0, -OPTIMAL_RADIUS - 2.0),
                Align2::CENTER_BOTTOM,
                format!("ótimo · custo {cost:.2}"),
                font,
                Color32::BLACK,
            );
        }
    }
}

impl MapView for CanvasMapView {
    fn name(&self) -> &'static str {
        "canvas"
    }

    fn request_fit(&mut self) {
        self.fit_requested = true;
    }

    fn show(&mut self, ui: &mut egui::Ui, scene: &MapScene) -> Option<MapInteraction> {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;

        if self.fit_requested {
            self.viewport.fit(scene.all_coords(), rect);
            self.fit_requested = false;
        }
        if response.dragged() {
            self.viewport.pan_by(response.drag_delta());
        }
        if response.hovered() {
            let zoom_delta = ui.input(|i| i.zoom_delta());
            if zoom_delta != 1.0 {
                let pointer = response.hover_pos().unwrap_or(rect.center());
                self.viewport
                    .zoom_around((zoom_delta as f64).log2(), pointer, rect);
            }
        }

        painter.rect_filled(rect, 0.0, BACKGROUND);
        self.paint_grid(&painter, rect);
        self.paint_scene(&painter, rect, scene);

        // zoom buttons, drawn over the map
        let mut interaction = None;
        let mut zoom_steps = 0.0;
        let buttons =
            Rect::from_min_size(rect.left_top() + Vec2::splat(8.0), Vec2::new(30.0, 90.0));
        ui.allocate_ui_at_rect(buttons, |ui| {
            if ui.button("+").clicked() {
                zoom_steps += 1.0;
            }
            if ui.button("−").clicked() {
                zoom_steps -= 1.0;
            }
            if ui.button("⛶").on_hover_text("mostrar todos").clicked() {
                self.fit_requested = true;
            }
        });
        if zoom_steps != 0.0 {
            self.viewport.zoom_around(zoom_steps, rect.center(), rect);
        }

        // markers without coordinates cannot be clicked on the map
        if !scene.unplaced.is_empty() {
            let list = Rect::from_min_max(
                rect.left_bottom() + Vec2::new(8.0, -24.0 * scene.unplaced.len() as f32 - 28.0),
                rect.left_bottom() + Vec2::new(220.0, -8.0),
            );
            ui.allocate_ui_at_rect(list, |ui| {
                ui.label(RichText::new("sem coordenadas").color(Color32::RED));
                for pin in &scene.unplaced {
                    if ui.small_button(format!("editar {}", pin.label)).clicked() {
                        interaction = Some(MapInteraction::EditMarker(pin.index));
                    }
                }
            });
        }

        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let hit = scene.hit_test(&self.viewport, rect, pointer, HIT_RADIUS);
                trace!(?hit, "map clicked");
                interaction = Some(hit);
            }
        }
        interaction
    }
}
