#![warn(missing_docs)]

//! Ward lookup on a slippy map for `egui`.
//!
//! The crate loads ward boundaries from GeoJSON and a candidate roster from CSV or JSON,
//! resolves a pin (dropped by a click or by a [`locate::Geolocator`]) to the ward that
//! contains it, highlights that ward on the map and lists its candidates in an overlay
//! panel.
//!
//! The pieces that do not need a window ([`geometry`], [`wards`], [`roster`], [`lookup`],
//! [`panel`]) can be used on their own. [`Map`] is the widget that draws tiles and layers,
//! and [`layers::ward::WardLayer`] puts a [`lookup::WardLookup`] on it.
//!
//! # Example
//!
//! ```no_run
//! use eframe::egui;
//! use ward_map_view::{Map, config::OpenStreetMapConfig, layers::ward::WardLayer};
//! use ward_map_view::{lookup::WardLookup, roster::CandidateRoster, wards::WardSet};
//!
//! struct MyApp {
//!     map: Map,
//! }
//!
//! impl Default for MyApp {
//!     fn default() -> Self {
//!         let mut map = Map::new(OpenStreetMapConfig::default());
//!         let lookup = WardLookup::new(WardSet::default(), CandidateRoster::default());
//!         map.add_layer("wards", WardLayer::new(lookup));
//!         Self { map }
//!     }
//! }
//!
//! impl eframe::App for MyApp {
//!     fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
//!         egui::CentralPanel::default()
//!             .frame(egui::Frame::NONE)
//!             .show(ctx, |ui| {
//!                 ui.add(&mut self.map);
//!             });
//!     }
//! }
//! ```

/// Configuration traits and types for the map widget.
pub mod config;

/// Point-in-polygon and bounding boxes.
pub mod geometry;

/// Map layers.
pub mod layers;

/// Geolocation providers.
pub mod locate;

/// The pin-drop context.
pub mod lookup;

/// The candidate info panel.
pub mod panel;

/// Converting between geographical and screen coordinates.
pub mod projection;

/// Candidate rosters.
pub mod roster;

/// Application settings.
pub mod settings;

mod tiles;

/// Ward boundaries.
pub mod wards;

use eframe::egui;
use egui::{Color32, Rect, Response, Sense, Ui, Widget};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::MapConfig;
use crate::layers::Layer;
use crate::projection::{GeoPos, MapProjection};
use crate::tiles::{TileCache, visible_tiles};

pub use crate::tiles::TileId;

// The size of a map tile in pixels.
const TILE_SIZE: u32 = 256;
/// The minimum zoom level.
pub const MIN_ZOOM: u8 = 0;
/// The maximum zoom level.
pub const MAX_ZOOM: u8 = 19;

pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while loading data or using the map widget.
#[derive(Error, Debug)]
pub enum MapError {
    /// An error occurred while making a web request.
    #[error("Connection error")]
    ConnectionError(#[from] reqwest::Error),

    /// A map tile failed to download.
    #[error("A map tile failed to download. HTTP Status: `{0}`")]
    TileDownloadError(String),

    /// The downloaded tile bytes could not be converted to an image.
    #[error("Unable to convert downloaded map tile bytes as image")]
    TileBytesConversionError(#[from] image::ImageError),

    /// A data or settings file could not be read.
    #[error("Unable to read `{}`", path.display())]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A roster CSV file is malformed.
    #[error("Malformed CSV roster")]
    Csv(#[from] csv::Error),

    /// A JSON document is malformed or has the wrong shape.
    #[error("Malformed JSON")]
    Json(#[from] serde_json::Error),

    /// A ward boundary file is not valid GeoJSON.
    #[error("Malformed GeoJSON")]
    GeoJson(#[from] geojson::Error),

    /// The settings file is not valid.
    #[error("Invalid settings")]
    Settings(#[from] toml::de::Error),

    /// A feature's geometry cannot describe a ward.
    #[error("Unsupported ward geometry: {0}")]
    UnsupportedGeometry(String),

    /// The format of a file could not be determined from its name.
    #[error("Unknown file format for `{}`", .0.display())]
    UnknownFormat(PathBuf),

    /// A position lookup failed.
    #[error("Geolocation failed: {0}")]
    Geolocation(String),
}

/// The map widget.
pub struct Map {
    /// The geographical center of the map.
    pub center: GeoPos,

    /// The zoom level of the map.
    pub zoom: u8,

    tiles: TileCache,

    /// The geographical position under the mouse pointer, if any.
    pub mouse_pos: Option<GeoPos>,

    /// Configuration for the map, such as the tile server URL.
    config: Box<dyn MapConfig>,

    layers: Vec<(String, Box<dyn Layer>)>,
}

impl Map {
    /// Creates a new `Map` widget.
    ///
    /// # Arguments
    ///
    /// * `config` - A type that implements `MapConfig`, which provides configuration for the map.
    pub fn new<C: MapConfig + 'static>(config: C) -> Self {
        Self {
            center: config.default_center(),
            zoom: config.default_zoom().clamp(config.min_zoom(), MAX_ZOOM),
            tiles: TileCache::default(),
            mouse_pos: None,
            config: Box::new(config),
            layers: Vec::new(),
        }
    }

    /// Adds a layer on top of the existing ones. A layer with the same key is replaced in place.
    pub fn add_layer(&mut self, key: impl Into<String>, layer: impl Layer) {
        let key = key.into();
        let layer: Box<dyn Layer> = Box::new(layer);
        match self.layers.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = layer,
            None => self.layers.push((key, layer)),
        }
    }

    /// Removes a layer. Returns `true` if it existed.
    pub fn remove_layer(&mut self, key: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|(k, _)| k != key);
        self.layers.len() != before
    }

    /// Gets a layer by key, if it exists and has type `T`.
    pub fn layer<T: Layer>(&self, key: &str) -> Option<&T> {
        self.layers
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any().downcast_ref::<T>())
    }

    /// Gets a layer mutably by key, if it exists and has type `T`.
    pub fn layer_mut<T: Layer>(&mut self, key: &str) -> Option<&mut T> {
        self.layers
            .iter_mut()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any_mut().downcast_mut::<T>())
    }

    /// Centers the map on `pos` at `zoom`, clamped to the allowed zoom range.
    pub fn fly_to(&mut self, pos: GeoPos, zoom: u8) {
        self.center = pos;
        self.zoom = zoom.clamp(self.config.min_zoom(), MAX_ZOOM);
    }

    /// Handles user input for panning and zooming.
    fn handle_input(&mut self, ui: &Ui, rect: &Rect, response: &Response) {
        let tile_size = TILE_SIZE as f64;

        if response.dragged() {
            let delta = response.drag_delta();
            let world = 2.0_f64.powi(self.zoom as i32);
            let half_view_x = rect.width() as f64 / tile_size / 2.0;
            let half_view_y = rect.height() as f64 / tile_size / 2.0;

            // Keep the world filling the view; a world smaller than the view stays centered.
            let clamp = |value: f64, half_view: f64| {
                if half_view > world - half_view {
                    world / 2.0
                } else {
                    value.clamp(half_view, world - half_view)
                }
            };

            let x = clamp(lon_to_x(self.center.lon, self.zoom) - delta.x as f64 / tile_size, half_view_x);
            let y = clamp(lat_to_y(self.center.lat, self.zoom) - delta.y as f64 / tile_size, half_view_y);
            self.center = GeoPos {
                lon: x_to_lon(x, self.zoom),
                lat: y_to_lat(y, self.zoom),
            };
        }

        if response.double_clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                let target = MapProjection::new(self.zoom, self.center, *rect).unproject(pointer_pos);
                self.fly_to(target, self.zoom.saturating_add(1));
            }
        }

        self.mouse_pos = None;
        if !response.hovered() {
            return;
        }
        let Some(mouse_pos) = response.hover_pos() else {
            return;
        };

        let projection = MapProjection::new(self.zoom, self.center, *rect);
        let target = projection.unproject(mouse_pos);
        self.mouse_pos = Some(target);

        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll == 0.0 {
            return;
        }

        let old_zoom = self.zoom;
        let mut new_zoom = (old_zoom as i32 + scroll.signum() as i32)
            .clamp(self.config.min_zoom() as i32, MAX_ZOOM as i32) as u8;

        // Zooming out stops once the world would no longer fill the widget.
        if new_zoom < old_zoom {
            let world_pixels = 2.0_f64.powi(new_zoom as i32) * tile_size;
            if world_pixels < rect.width() as f64 || world_pixels < rect.height() as f64 {
                new_zoom = old_zoom;
            }
        }
        if new_zoom == old_zoom {
            return;
        }

        // Keep the position under the mouse pointer fixed.
        let offset = mouse_pos - rect.center();
        let center_x = lon_to_x(target.lon, new_zoom) - offset.x as f64 / tile_size;
        let center_y = lat_to_y(target.lat, new_zoom) - offset.y as f64 / tile_size;
        self.zoom = new_zoom;
        self.center = GeoPos {
            lon: x_to_lon(center_x, new_zoom),
            lat: y_to_lat(center_y, new_zoom),
        };
    }

    /// Draws the attribution text.
    fn draw_attribution(&self, ui: &mut Ui, rect: &Rect) {
        let Some(attribution) = self.config.attribution() else {
            return;
        };

        let bg_color = if ui.visuals().dark_mode {
            Color32::from_black_alpha(150)
        } else {
            Color32::from_white_alpha(150)
        };

        let frame = egui::Frame::NONE
            .inner_margin(egui::Margin::same(5))
            .fill(bg_color)
            .corner_radius(3.0);

        egui::Area::new(ui.id().with("attribution"))
            .fixed_pos(rect.left_bottom())
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(5.0, -5.0))
            .show(ui.ctx(), |ui| {
                frame.show(ui, |ui| {
                    ui.style_mut().override_text_style = Some(egui::TextStyle::Small);
                    ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend);

                    match self.config.attribution_url() {
                        Some(url) => ui.hyperlink_to(attribution, url),
                        None => ui.label(attribution),
                    };
                });
            });
    }
}

/// Converts longitude to the x-coordinate of a tile at a given zoom level.
fn lon_to_x(lon: f64, zoom: u8) -> f64 {
    (lon + 180.0) / 360.0 * (2.0_f64.powi(zoom as i32))
}

/// Converts latitude to the y-coordinate of a tile at a given zoom level.
fn lat_to_y(lat: f64, zoom: u8) -> f64 {
    (1.0 - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2.0
        * (2.0_f64.powi(zoom as i32))
}

/// Converts the x-coordinate of a tile to longitude at a given zoom level.
fn x_to_lon(x: f64, zoom: u8) -> f64 {
    x / (2.0_f64.powi(zoom as i32)) * 360.0 - 180.0
}

/// Converts the y-coordinate of a tile to latitude at a given zoom level.
fn y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / (2.0_f64.powi(zoom as i32));
    n.sinh().atan().to_degrees()
}

impl Widget for &mut Map {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::drag().union(Sense::click()));

        // Top-most layers get the first chance at the input.
        let projection = MapProjection::new(self.zoom, self.center, rect);
        let mut handled = false;
        for (_, layer) in self.layers.iter_mut().rev() {
            if layer.handle_input(&response, &projection) {
                handled = true;
                break;
            }
        }
        if !handled {
            self.handle_input(ui, &rect, &response);
        }

        let projection = MapProjection::new(self.zoom, self.center, rect);
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_rgb(220, 220, 220));

        for (tile_id, tile_pos) in visible_tiles(&projection) {
            self.tiles.request(self.config.as_ref(), ui.ctx(), tile_id);
            self.tiles.draw(&painter, &tile_id, tile_pos);
        }
        self.tiles.evict();

        for (_, layer) in &self.layers {
            layer.draw(&painter, &projection);
        }

        self.draw_attribution(ui, &rect);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OpenStreetMapConfig, TemplateMapConfig};
    use crate::layers::ward::WardLayer;
    use crate::lookup::WardLookup;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_coord_conversion_roundtrip() {
        let zoom: u8 = 13;
        for (lon, lat) in [(-79.363612, 43.650308), (-79.6248, 43.6777)] {
            let final_lon = x_to_lon(lon_to_x(lon, zoom), zoom);
            let final_lat = y_to_lat(lat_to_y(lat, zoom), zoom);
            assert!((lon - final_lon).abs() < EPSILON);
            assert!((lat - final_lat).abs() < EPSILON);
        }
    }

    #[test]
    fn test_y_to_lat_conversion() {
        // y, zoom, expected_lat
        let test_cases = vec![
            // Equator
            (0.5, 0, 0.0),
            (128.0, 8, 0.0),
            // Near poles (Mercator projection limits)
            (0.0, 0, 85.0511287798),
            (1.0, 0, -85.0511287798),
        ];

        for (y, zoom, expected_lat) in test_cases {
            assert!((y_to_lat(y, zoom) - expected_lat).abs() < EPSILON);
        }
    }

    #[test]
    fn test_lon_to_x_conversion() {
        // lon, zoom, expected_x
        let test_cases = vec![
            (0.0, 0, 0.5),
            (-180.0, 8, 0.0),
            (180.0, 8, 256.0),
            (-90.0, 2, 1.0),
        ];

        for (lon, zoom, expected_x) in test_cases {
            assert!((lon_to_x(lon, zoom) - expected_x).abs() < EPSILON);
        }
    }

    #[test]
    fn test_map_new() {
        let config = OpenStreetMapConfig::default();
        let default_center = config.default_center();
        let default_zoom = config.default_zoom();

        let map = Map::new(config);

        assert_eq!(map.center, default_center);
        assert_eq!(map.zoom, default_zoom);
        assert!(map.mouse_pos.is_none());
        assert!(map.tiles.is_empty());
        assert!(map.layers.is_empty());
    }

    #[test]
    fn default_zoom_respects_min_zoom() {
        let config = TemplateMapConfig::new("{z}/{x}/{y}", GeoPos::default(), 3).with_min_zoom(11);
        let mut map = Map::new(config);
        assert_eq!(map.zoom, 11);

        map.fly_to(GeoPos::from_lat_lon(43.65, -79.38), 5);
        assert_eq!(map.zoom, 11);
        map.fly_to(GeoPos::from_lat_lon(43.65, -79.38), 25);
        assert_eq!(map.zoom, MAX_ZOOM);
        assert_eq!(map.center, GeoPos::from_lat_lon(43.65, -79.38));
    }

    #[test]
    fn layers_by_key_and_type() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        map.add_layer("wards", WardLayer::new(WardLookup::default()));
        assert!(map.layer::<WardLayer>("wards").is_some());
        assert!(map.layer_mut::<WardLayer>("wards").is_some());
        assert!(map.layer::<WardLayer>("other").is_none());

        map.add_layer("wards", WardLayer::new(WardLookup::default()));
        assert_eq!(map.layers.len(), 1);

        assert!(map.remove_layer("wards"));
        assert!(!map.remove_layer("wards"));
        assert!(map.layer::<WardLayer>("wards").is_none());
    }
}
