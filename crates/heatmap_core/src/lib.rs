//! Store-agnostic domain for the opportunity heatmap: scenario overlay,
//! geofence filtering and H3 grid materialisation.

pub mod api;
pub mod error;
pub mod feature;
pub mod geofence;
pub mod geometry;
pub mod grid;
pub mod ident;
pub mod ids;
pub mod materialize;
pub mod overlay;
pub mod predicate;
pub mod request;

pub use api::{BuildMode, BuildReport, OpportunityTableApi};
pub use error::{HeatmapError, HeatmapResult};
pub use feature::{EditType, Feature, ScenarioEdit};
pub use geofence::{GeofenceFilter, GeofenceRegion, GeofenceSpec};
pub use geometry::FeatureGeometry;
pub use grid::{GridCell, GridResolution, SHARD_RESOLUTION};
pub use ident::{Ident, TableName};
pub use ids::{FeatureId, LayerProjectId, ScenarioId};
pub use materialize::{MaterializeParams, OpportunityRecord, materialize};
pub use overlay::resolve_overlay;
pub use predicate::{CompareOp, FilterValue, Predicate};
pub use request::{HeatmapRequest, RequestLimits, ValidatedRequest};
