use serde::{Deserialize, Serialize};

use crate::feature::Feature;
use crate::grid::{GridCell, GridResolution};
use crate::ids::FeatureId;
use crate::{HeatmapError, HeatmapResult};

/// One row of the opportunity table.
#[derive(Clone, Debug, PartialEq)]
pub struct OpportunityRecord {
    pub id: FeatureId,
    pub grid_cell: GridCell,
    pub max_traveltime: i16,
    pub sensitivity: f64,
    pub potential: Option<f64>,
    pub shard_key: i32,
}

/// Constants stamped onto every record of one run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterializeParams {
    pub resolution: GridResolution,
    pub max_traveltime: i16,
    pub sensitivity: f64,
}

/// Project every feature onto the grid; one record per feature.
pub fn materialize(
    features: &[Feature],
    params: &MaterializeParams,
) -> HeatmapResult<Vec<OpportunityRecord>> {
    features
        .iter()
        .map(|feature| {
            let point = feature.geometry.representative_point().map_err(|err| {
                HeatmapError::geometry(format!("feature {}: {err}", feature.id))
            })?;
            let grid_cell = GridCell::for_point(point, params.resolution)?;
            Ok(OpportunityRecord {
                id: feature.id,
                grid_cell,
                max_traveltime: params.max_traveltime,
                sensitivity: params.sensitivity,
                potential: feature.potential,
                shard_key: grid_cell.shard_key(),
            })
        })
        .collect()
}
