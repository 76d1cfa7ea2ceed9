//! Map projection.

use egui::Rect;
use serde::{Deserialize, Serialize};

use crate::{TILE_SIZE, lat_to_y, lon_to_x, x_to_lon, y_to_lat};

/// A geographical position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    /// Longitude in degrees.
    pub lon: f64,

    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoPos {
    /// Creates a position from latitude and longitude, in that order.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<(f64, f64)> for GeoPos {
    /// Converts a `(longitude, latitude)` tuple.
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

impl From<GeoPos> for (f64, f64) {
    fn from(pos: GeoPos) -> Self {
        (pos.lon, pos.lat)
    }
}

/// A helper for converting between geographical and screen coordinates.
pub struct MapProjection {
    zoom: u8,
    center: GeoPos,
    widget_rect: Rect,
}

impl MapProjection {
    /// Creates a new `MapProjection`.
    pub(crate) fn new(zoom: u8, center: GeoPos, widget_rect: Rect) -> Self {
        Self {
            zoom,
            center,
            widget_rect,
        }
    }

    /// The zoom level this projection was built for.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// The screen rectangle of the map widget.
    pub fn widget_rect(&self) -> Rect {
        self.widget_rect
    }

    /// Center of the view in fractional tile coordinates.
    pub(crate) fn center_tile(&self) -> (f64, f64) {
        (
            lon_to_x(self.center.lon, self.zoom),
            lat_to_y(self.center.lat, self.zoom),
        )
    }

    /// Projects a geographical coordinate to a screen coordinate.
    pub fn project(&self, geo_pos: GeoPos) -> egui::Pos2 {
        let (center_x, center_y) = self.center_tile();

        let dx = (lon_to_x(geo_pos.lon, self.zoom) - center_x) * TILE_SIZE as f64;
        let dy = (lat_to_y(geo_pos.lat, self.zoom) - center_y) * TILE_SIZE as f64;

        self.widget_rect.center() + egui::vec2(dx as f32, dy as f32)
    }

    /// Un-projects a screen coordinate to a geographical coordinate.
    pub fn unproject(&self, screen_pos: egui::Pos2) -> GeoPos {
        let offset = screen_pos - self.widget_rect.center();
        let (center_x, center_y) = self.center_tile();

        let target_x = center_x + offset.x as f64 / TILE_SIZE as f64;
        let target_y = center_y + offset.y as f64 / TILE_SIZE as f64;

        GeoPos {
            lon: x_to_lon(target_x, self.zoom),
            lat: y_to_lat(target_y, self.zoom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    const EPSILON: f64 = 1e-6;

    fn toronto_projection() -> MapProjection {
        MapProjection::new(
            13,
            GeoPos::from_lat_lon(43.650308, -79.363612),
            Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0)),
        )
    }

    #[test]
    fn center_projects_to_widget_center() {
        let projection = toronto_projection();
        let screen = projection.project(GeoPos::from_lat_lon(43.650308, -79.363612));
        assert!((screen.x - 400.0).abs() < 1e-3);
        assert!((screen.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn unproject_inverts_project() {
        let projection = toronto_projection();
        let home = GeoPos::from_lat_lon(43.6405289, -79.4244113);
        let back = projection.unproject(projection.project(home));
        // Screen positions are f32, so the round trip is only good to a few decimals.
        assert!((back.lon - home.lon).abs() < EPSILON * 100.0);
        assert!((back.lat - home.lat).abs() < EPSILON * 100.0);
    }

    #[test]
    fn geo_pos_tuple_is_lon_lat() {
        let pos = GeoPos::from((-79.4, 43.6));
        assert_eq!(pos.lon, -79.4);
        assert_eq!(pos.lat, 43.6);
        let (lon, lat): (f64, f64) = pos.into();
        assert_eq!((lon, lat), (-79.4, 43.6));
    }
}
