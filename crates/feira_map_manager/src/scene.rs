use egui::{Pos2, Rect};
use feira_marker_models::{Coords, Marker, MarkerKind, OptimizationResult};

use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    /// position of the marker in the store
    pub index: usize,
    pub kind: MarkerKind,
    pub coords: Coords,
    pub quantity: i64,
    pub products: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapInteraction {
    /// click on an empty spot of the map
    NewMarker(Coords),
    /// click on an existing marker
    EditMarker(usize),
}

/// What a map view draws this frame.
#[derive(Debug, Clone, Default)]
pub struct MapScene {
    pub pins: Vec<Pin>,
    /// markers whose coordinates cannot be drawn, only reachable from a list
    pub unplaced: Vec<Pin>,
    pub optimal: Option<(Coords, f64)>,
    pub routes: Vec<Vec<Coords>>,
}

impl MapScene {
    /// Markers without usable coordinates go to `unplaced`, every pin keeps its index in the store.
    pub fn build(markers: &[Marker], result: Option<&OptimizationResult>) -> Self {
        let (pins, unplaced): (Vec<Pin>, Vec<Pin>) = markers
            .iter()
            .enumerate()
            .map(|(index, m)| {
                let products = m.products_label();
                Pin {
                    index,
                    kind: m.kind,
                    coords: m.coords,
                    quantity: m.quantidade,
                    label: format!("{} {}", index + 1, products),
                    products,
                }
            })
            .partition(|pin| pin.coords.is_finite());
        let (optimal, routes) = match result {
            Some(result) => (
                Some((result.optimal_location_coord, result.total_cost)),
                result.route_coords().collect(),
            ),
            None => (None, Vec::new()),
        };
        Self {
            pins,
            unplaced,
            optimal,
            routes,
        }
    }

    /// Every marker in store order, placed or not.
    pub fn rows(&self) -> Vec<&Pin> {
        let mut rows: Vec<&Pin> = self.pins.iter().chain(&self.unplaced).collect();
        rows.sort_by_key(|pin| pin.index);
        rows
    }

    /// Every coordinate worth showing, for `Viewport::fit`.
    pub fn all_coords(&self) -> impl Iterator<Item = Coords> + '_ {
        self.pins
            .iter()
            .map(|p| p.coords)
            .chain(self.optimal.map(|(c, _)| c))
    }

    /// The closest pin under `pointer` within `radius` points, or a new marker at the pointer.
    /// On equal distance the pin drawn last, the one on top, wins.
    /// A new marker past the antimeridian gets its longitude wrapped back.
    pub fn hit_test(
        &self,
        viewport: &Viewport,
        rect: Rect,
        pointer: Pos2,
        radius: f32,
    ) -> MapInteraction {
        self.pins
            .iter()
            .map(|pin| (pin.index, viewport.project(pin.coords, rect).distance(pointer)))
            .filter(|(_, distance)| *distance <= radius)
            .fold(None::<(usize, f32)>, |best, (index, distance)| match best {
                Some((_, best_distance)) if best_distance < distance => best,
                _ => Some((index, distance)),
            })
            .map(|(index, _)| MapInteraction::EditMarker(index))
            .unwrap_or_else(|| {
                MapInteraction::NewMarker(viewport.unproject(pointer, rect).normalized())
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use egui::Vec2;

    fn rect() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 400.0))
    }

    fn markers() -> Vec<Marker> {
        vec![
            Marker::new(MarkerKind::Mercado, Coords::new(-23.55, -46.63)),
            Marker::new(MarkerKind::Produtor, Coords::new(f64::NAN, -46.0)),
            Marker::new(MarkerKind::Produtor, Coords::new(-23.50, -46.60)),
        ]
    }

    #[test]
    fn nan_markers_are_skipped_but_indices_kept() {
        let scene = MapScene::build(&markers(), None);
        let indices: Vec<usize> = scene.pins.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2]);
        let unplaced: Vec<usize> = scene.unplaced.iter().map(|p| p.index).collect();
        assert_eq!(unplaced, vec![1]);
        assert!(scene.optimal.is_none());
        assert!(scene.routes.is_empty());
    }

    #[test]
    fn rows_list_every_marker_in_store_order() {
        let scene = MapScene::build(&markers(), None);
        let rows: Vec<(usize, bool)> = scene
            .rows()
            .iter()
            .map(|p| (p.index, p.coords.is_finite()))
            .collect();
        assert_eq!(rows, vec![(0, true), (1, false), (2, true)]);
        assert_eq!(scene.all_coords().count(), 2);
    }

    #[test]
    fn click_past_the_antimeridian_wraps_longitude() {
        let scene = MapScene::default();
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0));
        let viewport = Viewport::new(Coords::new(0.0, 170.0), 1.0);
        let pointer = Pos2::new(790.0, 300.0);
        let raw = viewport.unproject(pointer, rect);
        assert!(raw.lng > 180.0);
        match scene.hit_test(&viewport, rect, pointer, 10.0) {
            MapInteraction::NewMarker(coords) => {
                assert!(coords.is_valid(), "{coords}");
                assert!((coords.lng - (raw.lng - 360.0)).abs() < 1e-6);
                assert_eq!(coords.lat, raw.lat);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn result_is_part_of_the_scene() {
        let result = OptimizationResult {
            optimal_location_coord: Coords::new(-23.52, -46.61),
            total_cost: 12.5,
            routes: vec![vec![[-23.55, -46.63], [-23.52, -46.61]]],
        };
        let scene = MapScene::build(&markers(), Some(&result));
        assert_eq!(scene.optimal, Some((Coords::new(-23.52, -46.61), 12.5)));
        assert_eq!(scene.routes[0][1], Coords::new(-23.52, -46.61));
        assert_eq!(scene.all_coords().count(), 3);
    }

    #[test]
    fn click_on_pin_edits_it() {
        let scene = MapScene::build(&markers(), None);
        let viewport = Viewport::new(Coords::new(-23.55, -46.63), 10.0);
        let on_third = viewport.project(Coords::new(-23.50, -46.60), rect()) + Vec2::new(3.0, 0.0);
        assert_eq!(
            scene.hit_test(&viewport, rect(), on_third, 10.0),
            MapInteraction::EditMarker(2)
        );
        assert_eq!(
            scene.hit_test(&viewport, rect(), rect().center(), 10.0),
            MapInteraction::EditMarker(0)
        );
    }

    #[test]
    fn click_elsewhere_creates_at_pointer() {
        let scene = MapScene::build(&markers(), None);
        let viewport = Viewport::new(Coords::new(-23.55, -46.63), 10.0);
        let pointer = Pos2::new(20.0, 380.0);
        match scene.hit_test(&viewport, rect(), pointer, 10.0) {
            MapInteraction::NewMarker(coords) => {
                let expected = viewport.unproject(pointer, rect());
                assert_eq!(coords, expected);
                assert!(coords.lat < -23.55);
                assert!(coords.lng < -46.63);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overlapping_pins_pick_the_top_one() {
        let same = Coords::new(-23.55, -46.63);
        let markers = vec![
            Marker::new(MarkerKind::Mercado, same),
            Marker::new(MarkerKind::Produtor, same),
        ];
        let scene = MapScene::build(&markers, None);
        let viewport = Viewport::new(same, 10.0);
        assert_eq!(
            scene.hit_test(&viewport, rect(), rect().center(), 10.0),
            MapInteraction::EditMarker(1)
        );
    }
}
