//! Ward boundaries and point-to-ward resolution.

use geojson::{Feature, GeoJson, Value};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::MapError;
use crate::geometry::{BoundingBox, point_in_polygon};
use crate::projection::GeoPos;
use crate::roster::{WardId, WardIdNormalizer};

/// Which feature properties describe a ward, and how its identifier is normalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardSchema {
    /// Property holding the display name.
    pub name_property: String,

    /// Property the identifier is read from. Falls back to the name property.
    pub id_property: Option<String>,

    /// Rules turning the raw property into a [`WardId`].
    pub id_rules: WardIdNormalizer,
}

impl Default for WardSchema {
    fn default() -> Self {
        Self {
            name_property: "AREA_NAME".to_string(),
            id_property: None,
            id_rules: WardIdNormalizer::default(),
        }
    }
}

/// An administrative region with one or more outer rings.
#[derive(Clone, Debug, PartialEq)]
pub struct Ward {
    /// Normalized identifier, used to look up the roster.
    pub id: WardId,

    /// Display name.
    pub name: String,

    rings: Vec<Vec<GeoPos>>,
    bounds: BoundingBox,
}

impl Ward {
    /// Creates a ward. Rings with fewer than three points are dropped; returns `None` when
    /// no ring is left.
    pub fn new(id: WardId, name: impl Into<String>, rings: Vec<Vec<GeoPos>>) -> Option<Self> {
        let rings: Vec<_> = rings.into_iter().filter(|r| r.len() >= 3).collect();
        let bounds = rings
            .iter()
            .filter_map(|ring| BoundingBox::from_points(ring))
            .reduce(BoundingBox::union)?;
        Some(Self {
            id,
            name: name.into(),
            rings,
            bounds,
        })
    }

    /// The outer rings of the ward.
    pub fn rings(&self) -> &[Vec<GeoPos>] {
        &self.rings
    }

    /// The bounding box of all rings.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Whether any ring of the ward contains `point`.
    pub fn contains(&self, point: GeoPos) -> bool {
        self.bounds.contains(point) && self.rings.iter().any(|r| point_in_polygon(point, r))
    }

    /// Builds a ward from a GeoJSON feature. Features without polygon geometry are rejected.
    pub fn from_feature(feature: &Feature, schema: &WardSchema) -> Result<Self, MapError> {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| MapError::UnsupportedGeometry("missing geometry".to_string()))?;

        let rings = match &geometry.value {
            Value::Polygon(polygon) => vec![outer_ring(polygon)],
            Value::MultiPolygon(polygons) => polygons.iter().map(|p| outer_ring(p)).collect(),
            other => return Err(MapError::UnsupportedGeometry(geometry_name(other).to_string())),
        };

        let name = property_text(feature, &schema.name_property).unwrap_or_default();
        let raw_id = match &schema.id_property {
            Some(key) => property_text(feature, key).unwrap_or_default(),
            None => name.clone(),
        };

        Ward::new(schema.id_rules.normalize(&raw_id), name, rings)
            .ok_or_else(|| MapError::UnsupportedGeometry("ring with fewer than 3 points".to_string()))
    }
}

/// Converts the first ring of a GeoJSON polygon. Holes are not part of the ward model.
fn outer_ring(polygon: &[Vec<Vec<f64>>]) -> Vec<GeoPos> {
    if polygon.len() > 1 {
        debug!("Ignoring {} interior ring(s)", polygon.len() - 1);
    }
    polygon
        .first()
        .map(|ring| {
            ring.iter()
                .filter_map(|pos| match pos.as_slice() {
                    [lon, lat, ..] => Some(GeoPos {
                        lon: *lon,
                        lat: *lat,
                    }),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn property_text(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The ward collection a point is resolved against.
#[derive(Clone, Debug, Default)]
pub struct WardSet {
    wards: Vec<Ward>,
}

impl WardSet {
    /// Creates a set from wards, keeping their order.
    pub fn new(wards: Vec<Ward>) -> Self {
        Self { wards }
    }

    /// Parses a GeoJSON feature collection (or single feature). Features that are not
    /// polygons are skipped with a warning.
    pub fn from_geojson_str(s: &str, schema: &WardSchema) -> Result<Self, MapError> {
        let features = match s.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(geometry) => {
                return Err(MapError::UnsupportedGeometry(format!(
                    "bare {} geometry without properties",
                    geometry_name(&geometry.value)
                )));
            }
        };

        let mut wards = Vec::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            match Ward::from_feature(feature, schema) {
                Ok(ward) => wards.push(ward),
                Err(e) => warn!("Skipping feature {}: {}", i, e),
            }
        }
        Ok(Self::new(wards))
    }

    /// Reads a GeoJSON file.
    pub fn load(path: &Path, schema: &WardSchema) -> Result<Self, MapError> {
        let geojson = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let wards = Self::from_geojson_str(&geojson, schema)?;
        debug!("Loaded {} wards from {}", wards.len(), path.display());
        Ok(wards)
    }

    /// Index of the first ward containing `point`, if any.
    pub fn resolve(&self, point: GeoPos) -> Option<usize> {
        self.wards.iter().position(|ward| ward.contains(point))
    }

    /// The ward at `index`.
    pub fn get(&self, index: usize) -> Option<&Ward> {
        self.wards.get(index)
    }

    /// All wards in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Ward> {
        self.wards.iter()
    }

    /// The bounding box of every ward.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.wards.iter().map(Ward::bounds).reduce(BoundingBox::union)
    }

    /// Number of wards.
    pub fn len(&self) -> usize {
        self.wards.len()
    }

    /// Whether there are no wards.
    pub fn is_empty(&self) -> bool {
        self.wards.is_empty()
    }
}
