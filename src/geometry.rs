//! Planar geometry on geographical coordinates.
//!
//! Longitude is treated as the x axis and latitude as the y axis. Wards are small enough
//! that no projection is needed for containment tests.

use crate::projection::GeoPos;

/// Tests whether `point` lies inside the closed `ring` using the even-odd rule.
///
/// A horizontal ray is cast from the point towards increasing longitude and every edge it
/// crosses toggles the result. The ring may or may not repeat its first vertex at the end.
/// Rings with fewer than three vertices contain nothing. Points exactly on an edge or a
/// vertex may land on either side.
pub fn point_in_polygon(point: GeoPos, ring: &[GeoPos]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        // Horizontal and zero-length edges never straddle, so the division below is safe.
        if (a.lat > point.lat) != (b.lat > point.lat) {
            let crossing_lon = (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if point.lon < crossing_lon {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// An axis-aligned bounding box in geographical coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// South-west corner.
    pub min: GeoPos,
    /// North-east corner.
    pub max: GeoPos,
}

impl BoundingBox {
    /// Builds the smallest box containing all `points`, or `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a GeoPos>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(
            Self {
                min: first,
                max: first,
            },
            |bbox, p| bbox.extended(*p),
        ))
    }

    fn extended(self, p: GeoPos) -> Self {
        Self {
            min: GeoPos {
                lon: self.min.lon.min(p.lon),
                lat: self.min.lat.min(p.lat),
            },
            max: GeoPos {
                lon: self.max.lon.max(p.lon),
                lat: self.max.lat.max(p.lat),
            },
        }
    }

    /// Merges two boxes.
    pub fn union(self, other: Self) -> Self {
        self.extended(other.min).extended(other.max)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: GeoPos) -> bool {
        p.lon >= self.min.lon && p.lon <= self.max.lon && p.lat >= self.min.lat && p.lat <= self.max.lat
    }

    /// The middle of the box.
    pub fn center(&self) -> GeoPos {
        GeoPos {
            lon: (self.min.lon + self.max.lon) / 2.0,
            lat: (self.min.lat + self.max.lat) / 2.0,
        }
    }
}
