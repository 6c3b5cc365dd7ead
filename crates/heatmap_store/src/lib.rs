pub mod config;
pub mod datastore;
mod db;
pub mod migration;
pub mod partition;
mod query;
pub mod store;

pub use config::{
    DatabaseConfig, GeometryFormat, HeatmapConfig, LimitsConfig, PartitioningMode, PoolConfig,
};
pub use datastore::{default_sqlite_path, load_or_init_config, open_store};
pub use heatmap_core::*;
pub use partition::{CatalogPartitioner, CitusPartitioner, TablePartitioner};
pub use store::{BackendCapabilities, HeatmapStore};
