//! Application settings read from a TOML file.
//!
//! Every section and field has a default, so an empty file is valid:
//!
//! ```toml
//! [tiles]
//! url_template = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"
//! min_zoom = 11
//!
//! [view]
//! home = { lat = 43.6405289, lon = -79.4244113 }
//!
//! [wards]
//! path = "data/wards.geojson"
//! name_property = "AREA_NAME"
//! id_rules = ["trim", "leading_integer"]
//!
//! [roster]
//! path = "data/councillors.csv"
//! id_rules = ["trim", { strip_prefix = "Ward " }, "strip_leading_zeros"]
//!
//! [locate]
//! provider = "fixed"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::MapError;
use crate::config::TemplateMapConfig;
use crate::locate::{FixedLocator, Geolocator, IpLocator};
use crate::lookup::WardLookup;
use crate::projection::GeoPos;
use crate::roster::{CandidateRoster, RosterFormat, WardIdNormalizer};
use crate::wards::{WardSchema, WardSet};

/// All settings.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The base map.
    pub tiles: TileSettings,
    /// Initial view and pin-drop zoom.
    pub view: ViewSettings,
    /// Ward boundary source.
    pub wards: WardSettings,
    /// Candidate roster source.
    pub roster: RosterSettings,
    /// Geolocation.
    pub locate: LocateSettings,
}

/// Tile server settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TileSettings {
    /// URL with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    /// Attribution text.
    pub attribution: Option<String>,
    /// Attribution link.
    pub attribution_url: Option<String>,
    /// Lowest zoom level.
    pub min_zoom: u8,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: Some("Map data © OpenStreetMap contributors".to_string()),
            attribution_url: Some("https://www.openstreetmap.org/copyright".to_string()),
            min_zoom: 11,
        }
    }
}

/// Where the map starts and how close a pin drop zooms.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Initial center.
    pub home: GeoPos,
    /// Initial zoom.
    pub initial_zoom: u8,
    /// Zoom after a pin drop.
    pub local_zoom: u8,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            home: GeoPos::from_lat_lon(43.6405289, -79.4244113),
            initial_zoom: 11,
            local_zoom: 13,
        }
    }
}

/// Ward boundary file and schema.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WardSettings {
    /// GeoJSON file.
    pub path: PathBuf,
    /// Feature properties.
    #[serde(flatten)]
    pub schema: WardSchema,
}

impl Default for WardSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/wards.geojson"),
            schema: WardSchema::default(),
        }
    }
}

/// Roster file and ward label normalization.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RosterSettings {
    /// CSV or JSON file.
    pub path: PathBuf,
    /// File format.
    pub format: RosterFormat,
    /// Rules turning the roster's ward labels into ward ids.
    pub id_rules: WardIdNormalizer,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/councillors.csv"),
            format: RosterFormat::Auto,
            id_rules: WardIdNormalizer::default(),
        }
    }
}

/// Which geolocation provider to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocateProvider {
    /// Use [`LocateSettings::position`], or the home position.
    #[default]
    Fixed,
    /// Ask an IP geolocation service.
    Ip,
    /// Do not locate at startup.
    None,
}

/// Geolocation settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocateSettings {
    /// Provider.
    pub provider: LocateProvider,
    /// Service URL for the `ip` provider.
    pub url: String,
    /// Request timeout in seconds for the `ip` provider.
    pub timeout_secs: u64,
    /// Position for the `fixed` provider.
    pub position: Option<GeoPos>,
}

impl Default for LocateSettings {
    fn default() -> Self {
        Self {
            provider: LocateProvider::Fixed,
            url: "http://ip-api.com/json".to_string(),
            timeout_secs: 10,
            position: None,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, MapError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads settings from a file. Relative data paths are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let content = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&content)?;
        if let Some(dir) = path.parent() {
            settings.wards.path = dir.join(&settings.wards.path);
            settings.roster.path = dir.join(&settings.roster.path);
        }
        Ok(settings)
    }

    /// The tile source described by `[tiles]` and `[view]`.
    pub fn map_config(&self) -> TemplateMapConfig {
        let config = TemplateMapConfig::new(
            self.tiles.url_template.clone(),
            self.view.home,
            self.view.initial_zoom,
        )
        .with_min_zoom(self.tiles.min_zoom);
        match &self.tiles.attribution {
            Some(text) => config.with_attribution(text.clone(), self.tiles.attribution_url.clone()),
            None => config,
        }
    }

    /// Loads wards and roster into a fresh [`WardLookup`].
    pub fn load_lookup(&self) -> Result<WardLookup, MapError> {
        let wards = WardSet::load(&self.wards.path, &self.wards.schema)?;
        let roster = CandidateRoster::load(&self.roster.path, self.roster.format, &self.roster.id_rules)?;
        Ok(WardLookup::new(wards, roster))
    }

    /// The configured geolocation provider, if any.
    pub fn geolocator(&self) -> Option<Box<dyn Geolocator>> {
        match self.locate.provider {
            LocateProvider::Fixed => Some(Box::new(FixedLocator::new(
                self.locate.position.unwrap_or(self.view.home),
            ))),
            LocateProvider::Ip => Some(Box::new(IpLocator::new(
                self.locate.url.clone(),
                Duration::from_secs(self.locate.timeout_secs),
            ))),
            LocateProvider::None => None,
        }
    }
}
