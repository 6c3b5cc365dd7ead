//! The single entry point's parameters and their up-front validation.
//!
//! Everything checked here is checked before the destination table is
//! touched, so a rejected request never drops or writes anything.

use serde::{Deserialize, Serialize};

use crate::geofence::{GeofenceSpec, default_geometry_column};
use crate::grid::GridResolution;
use crate::ident::{Ident, TableName};
use crate::ids::{LayerProjectId, ScenarioId};
use crate::materialize::MaterializeParams;
use crate::predicate::Predicate;
use crate::{HeatmapError, HeatmapResult};

pub const DEFAULT_MAX_FEATURE_COUNT: u64 = 100_000;
pub const DEFAULT_MAX_SENSITIVITY: f64 = 1_000_000.0;

/// Scenario tables read from `customer_schema`.
pub const SCENARIO_TABLES: [&str; 2] = ["scenario_feature", "scenario_scenario_feature"];

/// Bounds a request is checked against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequestLimits {
    pub max_feature_count: u64,
    pub max_sensitivity: f64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_feature_count: DEFAULT_MAX_FEATURE_COUNT,
            max_sensitivity: DEFAULT_MAX_SENSITIVITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatmapRequest {
    pub layer_project_id: LayerProjectId,
    pub input_table: TableName,
    pub customer_schema: Ident,
    pub scenario_id: ScenarioId,
    #[serde(default)]
    pub geofence: Option<GeofenceSpec>,
    pub max_traveltime: i16,
    pub sensitivity: f64,
    pub potential_column: Ident,
    #[serde(default = "default_geometry_column")]
    pub geometry_column: Ident,
    #[serde(default)]
    pub where_filter: Predicate,
    pub result_table: TableName,
    pub grid_resolution: u8,
    #[serde(default)]
    pub append_existing: bool,
}

impl HeatmapRequest {
    /// Tables a build reads from, each paired with the role it plays.
    pub fn source_tables(&self) -> Vec<(&'static str, TableName)> {
        let mut sources = vec![("input table", self.input_table.clone())];
        if let Some(geofence) = &self.geofence {
            sources.push(("geofence source", geofence.source.clone()));
        }
        for table in SCENARIO_TABLES {
            sources.push((
                "scenario table",
                TableName::qualified(self.customer_schema.clone(), Ident::from_static(table)),
            ));
        }
        sources
    }

    /// `default_schema` is where the backend puts unqualified table names.
    pub fn validate(
        self,
        limits: &RequestLimits,
        default_schema: &Ident,
    ) -> HeatmapResult<ValidatedRequest> {
        let resolution = GridResolution::try_from(self.grid_resolution)?;
        if self.max_traveltime <= 0 {
            return Err(HeatmapError::validation(format!(
                "max travel time must be positive, got {}",
                self.max_traveltime
            )));
        }
        if !self.sensitivity.is_finite()
            || self.sensitivity <= 0.0
            || self.sensitivity > limits.max_sensitivity
        {
            return Err(HeatmapError::validation(format!(
                "sensitivity must be in (0, {}], got {}",
                limits.max_sensitivity, self.sensitivity
            )));
        }
        self.where_filter.validate()?;
        if let Some(geofence) = &self.geofence {
            geofence.validate()?;
        }
        for (role, source) in self.source_tables() {
            if self.result_table.refers_to_same(&source, default_schema) {
                return Err(HeatmapError::validation(format!(
                    "result table {} is also the {role} {source}",
                    self.result_table
                )));
            }
        }
        Ok(ValidatedRequest {
            request: self,
            resolution,
        })
    }
}

/// A request that passed [`HeatmapRequest::validate`].
#[derive(Clone, Debug)]
pub struct ValidatedRequest {
    request: HeatmapRequest,
    resolution: GridResolution,
}

impl ValidatedRequest {
    pub fn request(&self) -> &HeatmapRequest {
        &self.request
    }

    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    pub fn is_append(&self) -> bool {
        self.request.append_existing
    }

    pub fn materialize_params(&self) -> MaterializeParams {
        MaterializeParams {
            resolution: self.resolution,
            max_traveltime: self.request.max_traveltime,
            sensitivity: self.request.sensitivity,
        }
    }
}
