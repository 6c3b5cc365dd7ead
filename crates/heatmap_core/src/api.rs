use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{HeatmapRequest, HeatmapResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Destination dropped, recreated, shard key declared, indexed after load.
    Fresh,
    /// Rows inserted into an existing destination as-is.
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub rows_written: u64,
}

#[async_trait]
pub trait OpportunityTableApi {
    /// Materialise the heatmap for `request` into its result table.
    ///
    /// A fresh build (`append_existing = false`) destroys any existing table
    /// of the same name. Requests are validated before anything is dropped;
    /// a failure after that point may leave the table absent or partially
    /// populated, and the whole fresh build must be retried.
    async fn build_opportunity_table(&self, request: HeatmapRequest) -> HeatmapResult<BuildReport>;
}
