//! Geofence restriction of the merged feature set.
//!
//! The region is the union of the selected geometries buffered by a
//! distance in metres. The union is never materialised: a feature
//! intersects `buffer(union(G), d)` exactly when its distance to some member
//! of `G` is at most `d`, so each member is tested on its own, first by an
//! expanded bounding box and then by the exact distance.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::feature::Feature;
use crate::geometry::{BBox, FeatureGeometry, min_distance_between};
use crate::ident::{Ident, TableName};
use crate::predicate::Predicate;
use crate::{HeatmapError, HeatmapResult};

pub(crate) fn default_geometry_column() -> Ident {
    Ident::from_static("geom")
}

/// Where the geofence geometries come from and how far to buffer them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeofenceSpec {
    pub source: TableName,
    pub filter: Predicate,
    #[serde(default = "default_geometry_column")]
    pub geometry_column: Ident,
    /// Metres, applied on the sphere regardless of the source projection.
    #[serde(default)]
    pub buffer_distance: f64,
}

impl GeofenceSpec {
    pub fn new(source: TableName, filter: Predicate, buffer_distance: f64) -> Self {
        Self {
            source,
            filter,
            geometry_column: default_geometry_column(),
            buffer_distance,
        }
    }

    pub fn validate(&self) -> HeatmapResult<()> {
        if !self.buffer_distance.is_finite() || self.buffer_distance < 0.0 {
            return Err(HeatmapError::validation(format!(
                "geofence buffer distance must be a non-negative number, got {}",
                self.buffer_distance
            )));
        }
        self.filter.validate()
    }
}

#[derive(Clone, Debug)]
struct RegionMember {
    geometry: FeatureGeometry,
    reach: BBox,
}

#[derive(Clone, Debug)]
pub struct GeofenceRegion {
    members: Vec<RegionMember>,
    buffer_distance: f64,
}

impl GeofenceRegion {
    pub fn new(geometries: Vec<FeatureGeometry>, buffer_distance: f64) -> Self {
        let members = geometries
            .into_iter()
            .filter_map(|geometry| {
                let reach = geometry.bbox()?.expand_by_meters(buffer_distance);
                Some(RegionMember { geometry, reach })
            })
            .collect();
        Self {
            members,
            buffer_distance,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn intersects(&self, geometry: &FeatureGeometry) -> bool {
        let Some(bbox) = geometry.bbox() else {
            return false;
        };
        self.members.iter().any(|member| {
            member.reach.intersects(&bbox)
                && min_distance_between(geometry.as_geometry(), member.geometry.as_geometry())
                    <= self.buffer_distance
        })
    }
}

/// Optional geofence stage; `None` passes every feature through.
#[derive(Clone, Debug, Default)]
pub struct GeofenceFilter {
    region: Option<GeofenceRegion>,
}

impl GeofenceFilter {
    pub fn none() -> Self {
        Self { region: None }
    }

    pub fn region(region: GeofenceRegion) -> Self {
        Self {
            region: Some(region),
        }
    }

    pub fn apply(&self, features: Vec<Feature>) -> Vec<Feature> {
        let Some(region) = &self.region else {
            return features;
        };
        let before = features.len();
        let kept: Vec<Feature> = features
            .into_iter()
            .filter(|feature| region.intersects(&feature.geometry))
            .collect();
        debug!("heatmap: geofence kept {} of {before} features", kept.len());
        kept
    }
}

impl From<Option<GeofenceRegion>> for GeofenceFilter {
    fn from(region: Option<GeofenceRegion>) -> Self {
        Self { region }
    }
}
