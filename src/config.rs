//! Configuration for different map providers.

use crate::projection::GeoPos;
use crate::{MIN_ZOOM, TileId};

/// Configuration for a map provider.
pub trait MapConfig {
    /// Returns the URL for a given tile.
    fn tile_url(&self, tile: &TileId) -> String;

    /// Returns the attribution text to be displayed on the map. If returns `None`, no attribution is shown.
    fn attribution(&self) -> Option<&String>;

    /// Returns the attribution URL to be linked from the attribution text.
    fn attribution_url(&self) -> Option<&String>;

    /// The default geographical center of the map.
    fn default_center(&self) -> GeoPos;

    /// The default zoom level of the map.
    fn default_zoom(&self) -> u8;

    /// The lowest zoom level the user may zoom out to.
    fn min_zoom(&self) -> u8 {
        MIN_ZOOM
    }
}

/// Configuration for the OpenStreetMap tile server, centered on Toronto city hall.
///
/// # Example
///
/// ```
/// use ward_map_view::config::OpenStreetMapConfig;
/// let config = OpenStreetMapConfig::default();
/// ```
#[cfg(feature = "openstreetmap")]
pub struct OpenStreetMapConfig {
    base_url: String,
    attribution: String,
    attribution_url: String,
    default_center: GeoPos,
    default_zoom: u8,
}

#[cfg(feature = "openstreetmap")]
impl Default for OpenStreetMapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tile.openstreetmap.org".to_string(),
            attribution: "Map data © OpenStreetMap contributors".to_string(),
            attribution_url: "https://www.openstreetmap.org/copyright".to_string(),
            default_center: GeoPos::from_lat_lon(43.650308, -79.363612),
            default_zoom: 11,
        }
    }
}

#[cfg(feature = "openstreetmap")]
impl MapConfig for OpenStreetMapConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, tile.z, tile.x, tile.y)
    }

    fn attribution(&self) -> Option<&String> {
        Some(&self.attribution)
    }

    fn attribution_url(&self) -> Option<&String> {
        Some(&self.attribution_url)
    }

    fn default_center(&self) -> GeoPos {
        self.default_center
    }

    fn default_zoom(&self) -> u8 {
        self.default_zoom
    }
}

/// A tile source described by a URL template with `{z}`, `{x}` and `{y}` placeholders.
///
/// # Example
///
/// ```
/// use ward_map_view::config::TemplateMapConfig;
/// use ward_map_view::projection::GeoPos;
///
/// let config = TemplateMapConfig::new(
///     "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
///     GeoPos::from_lat_lon(43.65, -79.38),
///     11,
/// );
/// ```
pub struct TemplateMapConfig {
    url_template: String,
    attribution: Option<String>,
    attribution_url: Option<String>,
    default_center: GeoPos,
    default_zoom: u8,
    min_zoom: u8,
}

impl TemplateMapConfig {
    /// Creates a config without attribution.
    pub fn new(url_template: impl Into<String>, default_center: GeoPos, default_zoom: u8) -> Self {
        Self {
            url_template: url_template.into(),
            attribution: None,
            attribution_url: None,
            default_center,
            default_zoom,
            min_zoom: MIN_ZOOM,
        }
    }

    /// Sets the attribution text and optional link.
    pub fn with_attribution(mut self, text: impl Into<String>, url: Option<String>) -> Self {
        self.attribution = Some(text.into());
        self.attribution_url = url;
        self
    }

    /// Sets the lowest zoom level.
    pub fn with_min_zoom(mut self, min_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self
    }
}

impl MapConfig for TemplateMapConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        self.url_template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    fn attribution(&self) -> Option<&String> {
        self.attribution.as_ref()
    }

    fn attribution_url(&self) -> Option<&String> {
        self.attribution_url.as_ref()
    }

    fn default_center(&self) -> GeoPos {
        self.default_center
    }

    fn default_zoom(&self) -> u8 {
        self.default_zoom
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileId;

    #[test]
    #[cfg(feature = "openstreetmap")]
    fn openstreetmap_config_default() {
        let config = OpenStreetMapConfig::default();
        assert_eq!(config.base_url, "https://tile.openstreetmap.org");
        assert_eq!(config.attribution, "Map data © OpenStreetMap contributors");
        assert_eq!(config.default_center, GeoPos::from_lat_lon(43.650308, -79.363612));
        assert_eq!(config.default_zoom, 11);
        assert_eq!(config.min_zoom(), MIN_ZOOM);
    }

    #[test]
    #[cfg(feature = "openstreetmap")]
    fn openstreetmap_config_tile_url() {
        let config = OpenStreetMapConfig::default();
        let tile_id = TileId { z: 10, x: 1, y: 2 };
        assert_eq!(config.tile_url(&tile_id), "https://tile.openstreetmap.org/10/1/2.png");
    }

    #[test]
    fn template_config_fills_placeholders() {
        let config = TemplateMapConfig::new(
            "https://a.example.org/{z}/{x}/{y}.png?key=abc",
            GeoPos::default(),
            3,
        )
        .with_min_zoom(11);
        let tile_id = TileId { z: 13, x: 2288, y: 2990 };
        assert_eq!(
            config.tile_url(&tile_id),
            "https://a.example.org/13/2288/2990.png?key=abc"
        );
        assert_eq!(config.min_zoom(), 11);
        assert!(config.attribution().is_none());
    }

    #[test]
    fn template_config_attribution() {
        let config = TemplateMapConfig::new("{z}/{x}/{y}", GeoPos::default(), 3)
            .with_attribution("© somebody", Some("https://example.org".to_string()));
        assert_eq!(config.attribution().map(String::as_str), Some("© somebody"));
        assert_eq!(
            config.attribution_url().map(String::as_str),
            Some("https://example.org")
        );
    }
}
