//! Everything that puts markers on screen.
//! `MapScene` is what is drawn, `Viewport` is where it is drawn, and a `MapView` draws it and
//! turns clicks into `MapInteraction`s for the screen to open the marker form.

mod canvas;
mod scene;
mod table;
mod viewport;

pub use canvas::CanvasMapView;
pub use scene::{MapInteraction, MapScene, Pin};
pub use table::TableMapView;
pub use viewport::Viewport;

use serde::{Deserialize, Serialize};

/// A map view for one kind of target. Both views share the scene and the interactions they emit.
pub trait MapView {
    fn name(&self) -> &'static str;
    fn show(&mut self, ui: &mut egui::Ui, scene: &MapScene) -> Option<MapInteraction>;
    /// Asks the view to bring every marker into sight on its next frame.
    fn request_fit(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapViewKind {
    /// pan/zoom canvas, for a mouse
    #[default]
    Canvas,
    /// list of markers with coordinate entry, for small screens
    Table,
}

impl MapViewKind {
    pub fn build(self, viewport: Viewport) -> Box<dyn MapView> {
        match self {
            Self::Canvas => Box::new(CanvasMapView::new(viewport)),
            Self::Table => Box::new(TableMapView::default()),
        }
    }
}
