use std::f64::consts::PI;

use egui::{Pos2, Rect, Vec2};
use feira_marker_models::Coords;
use glam::DVec2;

pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 19.0;
// beyond this the mercator y goes to infinity
const MAX_SIN_LAT: f64 = 0.9999;

/// Web-Mercator view of the world: `center` is drawn at the middle of the screen rect,
/// one world is `256 * 2^zoom` points wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coords,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        // São Paulo
        Self {
            center: Coords::new(-23.55, -46.63),
            zoom: 9.0,
        }
    }
}

impl Viewport {
    pub fn new(center: Coords, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    fn world_size(zoom: f64) -> f64 {
        TILE_SIZE * 2f64.powf(zoom)
    }

    fn to_world(coords: Coords, zoom: f64) -> DVec2 {
        let size = Self::world_size(zoom);
        let sin_lat = coords.lat.to_radians().sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
        DVec2::new(
            (coords.lng + 180.0) / 360.0 * size,
            (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * size,
        )
    }

    fn from_world(p: DVec2, zoom: f64) -> Coords {
        let size = Self::world_size(zoom);
        let n = PI - 2.0 * PI * p.y / size;
        Coords::new(n.sinh().atan().to_degrees(), p.x / size * 360.0 - 180.0)
    }

    pub fn project(&self, coords: Coords, rect: Rect) -> Pos2 {
        let d = Self::to_world(coords, self.zoom) - Self::to_world(self.center, self.zoom);
        rect.center() + Vec2::new(d.x as f32, d.y as f32)
    }

    pub fn unproject(&self, pos: Pos2, rect: Rect) -> Coords {
        let d = pos - rect.center();
        let p = Self::to_world(self.center, self.zoom) + DVec2::new(d.x as f64, d.y as f64);
        Self::from_world(p, self.zoom)
    }

    /// Moves the map with the pointer: dragging right shows what is to the west.
    pub fn pan_by(&mut self, delta: Vec2) {
        let p = Self::to_world(self.center, self.zoom) - DVec2::new(delta.x as f64, delta.y as f64);
        self.center = Self::from_world(p, self.zoom);
    }

    /// Changes the zoom by `steps` levels, the coordinate under `pos` stays under `pos`.
    pub fn zoom_around(&mut self, steps: f64, pos: Pos2, rect: Rect) {
        let anchor = self.unproject(pos, rect);
        self.zoom = (self.zoom + steps).clamp(MIN_ZOOM, MAX_ZOOM);
        let d = pos - rect.center();
        let p = Self::to_world(anchor, self.zoom) - DVec2::new(d.x as f64, d.y as f64);
        self.center = Self::from_world(p, self.zoom);
    }

    /// Centers on the bounding box of `coords` and picks the largest zoom that shows all of them.
    /// Non finite coordinates are ignored, nothing changes if none is left.
    pub fn fit(&mut self, coords: impl IntoIterator<Item = Coords>, rect: Rect) {
        let points: Vec<DVec2> = coords
            .into_iter()
            .filter(Coords::is_finite)
            .map(|c| Self::to_world(c, 0.0))
            .collect();
        let Some(first) = points.first() else {
            return;
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        self.center = Self::from_world((min + max) / 2.0, 0.0);

        let extent = max - min;
        // 80% of the rect, so that pins on the border are fully visible
        let usable = DVec2::new(rect.width() as f64, rect.height() as f64) * 0.8;
        let zoom = if extent.x <= f64::EPSILON && extent.y <= f64::EPSILON {
            MAX_ZOOM - 4.0
        } else {
            (usable / extent.max(DVec2::splat(f64::EPSILON))).min_element().log2()
        };
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }
}
