//! Feature geometry and the geographic measurements the geofence needs.
//!
//! Coordinates follow the WKT/GeoJSON convention: `x` is longitude and `y`
//! is latitude, both in degrees (WGS84). Distances are metres on a sphere.

use geo::{BoundingRect, Centroid, Contains, CoordsIter, Intersects};
use geo_types::{Geometry, LineString, Point};
use wkt::TryFromWkt;

use crate::{HeatmapError, HeatmapResult};

pub(crate) const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Metres spanned by one degree of latitude on the reference sphere.
pub(crate) const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureGeometry(Geometry<f64>);

impl FeatureGeometry {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self(geometry)
    }

    pub fn point(lng: f64, lat: f64) -> Self {
        Self(Geometry::Point(Point::new(lng, lat)))
    }

    pub fn from_wkt(wkt: &str) -> HeatmapResult<Self> {
        Geometry::<f64>::try_from_wkt_str(wkt)
            .map(Self)
            .map_err(|err| HeatmapError::geometry(format!("wkt parse error: {err:?}")))
    }

    pub fn as_geometry(&self) -> &Geometry<f64> {
        &self.0
    }

    /// The point a feature contributes to the grid: the geometry itself for
    /// points, the centroid for everything else.
    pub fn representative_point(&self) -> HeatmapResult<Point<f64>> {
        let point = match &self.0 {
            Geometry::Point(point) => Some(*point),
            other => other.centroid(),
        };
        point.ok_or_else(|| HeatmapError::geometry("geometry has no representative point"))
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_geometry(&self.0)
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BBox {
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lng <= other.max_lng
            && self.max_lng >= other.min_lng
    }

    /// Grow the box by `meters` on every side.
    ///
    /// The longitude margin is computed at the most poleward latitude of the
    /// grown box, so the result always contains every point within `meters`
    /// of the unexpanded box. Near the poles the box spans all longitudes.
    pub fn expand_by_meters(&self, meters: f64) -> Self {
        if meters <= 0.0 {
            return *self;
        }
        let lat_margin = meters / METERS_PER_DEGREE;
        let min_lat = (self.min_lat - lat_margin).max(-90.0);
        let max_lat = (self.max_lat + lat_margin).min(90.0);
        let widest = min_lat.abs().max(max_lat.abs()).to_radians().cos();
        let lng_margin = if widest <= f64::EPSILON {
            360.0
        } else {
            meters / (METERS_PER_DEGREE * widest)
        };
        if lng_margin >= 180.0 {
            return Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }
        Self {
            min_lat,
            max_lat,
            min_lng: self.min_lng - lng_margin,
            max_lng: self.max_lng + lng_margin,
        }
    }
}

pub(crate) fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Minimum distance in metres between two geometries; zero when they
/// intersect.
///
/// For disjoint geometries the closest pair always involves a vertex of one
/// of them, so checking every vertex against the other geometry is exact.
pub(crate) fn min_distance_between(a: &Geometry<f64>, b: &Geometry<f64>) -> f64 {
    if a.intersects(b) {
        return 0.0;
    }
    let from_a = a
        .coords_iter()
        .map(|c| min_distance_to_geometry(c.y, c.x, b))
        .fold(f64::INFINITY, f64::min);
    let from_b = b
        .coords_iter()
        .map(|c| min_distance_to_geometry(c.y, c.x, a))
        .fold(f64::INFINITY, f64::min);
    from_a.min(from_b)
}

/// Minimum distance in metres from a point to a geometry.
pub(crate) fn min_distance_to_geometry(lat: f64, lng: f64, geom: &Geometry<f64>) -> f64 {
    let point = Point::new(lng, lat);
    match geom {
        Geometry::Point(p) => haversine_distance(lat, lng, p.y(), p.x()),
        Geometry::MultiPoint(mp) => mp
            .iter()
            .map(|p| haversine_distance(lat, lng, p.y(), p.x()))
            .fold(f64::INFINITY, f64::min),
        Geometry::Line(line) => {
            min_distance_to_segment(lat, lng, line.start.y, line.start.x, line.end.y, line.end.x)
        }
        Geometry::LineString(ls) => min_distance_to_linestring(lat, lng, ls),
        Geometry::MultiLineString(mls) => mls
            .iter()
            .map(|ls| min_distance_to_linestring(lat, lng, ls))
            .fold(f64::INFINITY, f64::min),
        Geometry::Polygon(poly) => {
            if poly.contains(&point) {
                return 0.0;
            }
            // Inside a hole the nearest boundary may be the hole's ring.
            poly.interiors()
                .iter()
                .map(|ring| min_distance_to_linestring(lat, lng, ring))
                .fold(min_distance_to_linestring(lat, lng, poly.exterior()), f64::min)
        }
        Geometry::MultiPolygon(mp) => mp
            .iter()
            .map(|poly| min_distance_to_geometry(lat, lng, &Geometry::Polygon(poly.clone())))
            .fold(f64::INFINITY, f64::min),
        Geometry::Rect(rect) => {
            min_distance_to_geometry(lat, lng, &Geometry::Polygon(rect.to_polygon()))
        }
        Geometry::Triangle(tri) => {
            min_distance_to_geometry(lat, lng, &Geometry::Polygon(tri.to_polygon()))
        }
        Geometry::GeometryCollection(gc) => gc
            .iter()
            .map(|g| min_distance_to_geometry(lat, lng, g))
            .fold(f64::INFINITY, f64::min),
    }
}

fn min_distance_to_linestring(lat: f64, lng: f64, ls: &LineString<f64>) -> f64 {
    if ls.0.is_empty() {
        return f64::INFINITY;
    }
    if ls.0.len() == 1 {
        return haversine_distance(lat, lng, ls.0[0].y, ls.0[0].x);
    }
    ls.0.windows(2)
        .map(|pair| min_distance_to_segment(lat, lng, pair[0].y, pair[0].x, pair[1].y, pair[1].x))
        .fold(f64::INFINITY, f64::min)
}

/// Planar projection onto the segment, haversine for the final distance.
fn min_distance_to_segment(lat: f64, lng: f64, lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dx = lng2 - lng1;
    let dy = lat2 - lat1;
    if dx == 0.0 && dy == 0.0 {
        return haversine_distance(lat, lng, lat1, lng1);
    }
    let t = (((lng - lng1) * dx + (lat - lat1) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
    haversine_distance(lat, lng, lat1 + t * dy, lng1 + t * dx)
}
