use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use heatmap_core::request::{DEFAULT_MAX_FEATURE_COUNT, DEFAULT_MAX_SENSITIVITY};
use heatmap_core::{HeatmapError, HeatmapResult, RequestLimits};

const DEFAULT_CONFIG_NAME: &str = "heatmap.json";
const DEFAULT_INSERT_BATCH_SIZE: usize = 1_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_feature_count: Option<u64>,
    pub max_sensitivity: Option<f64>,
    pub insert_batch_size: Option<usize>,
}

impl LimitsConfig {
    pub fn with_defaults() -> Self {
        Self {
            max_feature_count: Some(DEFAULT_MAX_FEATURE_COUNT),
            max_sensitivity: Some(DEFAULT_MAX_SENSITIVITY),
            insert_batch_size: Some(DEFAULT_INSERT_BATCH_SIZE),
        }
    }

    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_feature_count: self.max_feature_count.unwrap_or(DEFAULT_MAX_FEATURE_COUNT),
            max_sensitivity: self.max_sensitivity.unwrap_or(DEFAULT_MAX_SENSITIVITY),
        }
    }

    pub fn insert_batch_size(&self) -> usize {
        self.insert_batch_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_INSERT_BATCH_SIZE)
    }
}

/// How a freshly created result table gets its shard key declared.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartitioningMode {
    /// Record the shard column in the `heatmap_partitions` catalog.
    #[default]
    Catalog,
    /// Call Citus `create_distributed_table` (Postgres only).
    Citus,
}

/// How geometry columns are read back from the store.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFormat {
    /// Columns already hold WKT text.
    #[default]
    Wkt,
    /// PostGIS geometry columns, selected through `ST_AsText`.
    Postgis,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeatmapConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
    pub limits: Option<LimitsConfig>,
    pub partitioning: Option<PartitioningMode>,
    pub geometry_format: Option<GeometryFormat>,
}

impl HeatmapConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
            limits: Some(LimitsConfig::with_defaults()),
            partitioning: Some(PartitioningMode::Catalog),
            geometry_format: Some(GeometryFormat::Wkt),
        }
    }

    pub fn load_or_init(base_dir: &Path, default_sqlite_path: &Path) -> HeatmapResult<Self> {
        fs::create_dir_all(base_dir)
            .map_err(|err| HeatmapError::storage(format!("create config dir: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|err| HeatmapError::storage(format!("read config: {err}")))?;
            let config: HeatmapConfig = serde_json::from_str(&raw)
                .map_err(|err| HeatmapError::validation(format!("parse config: {err}")))?;
            return Ok(config);
        }
        let default = HeatmapConfig::default_sqlite(default_sqlite_path.to_string_lossy());
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| HeatmapError::storage(format!("serialize config: {err}")))?;
        fs::write(&config_path, payload)
            .map_err(|err| HeatmapError::storage(format!("write config: {err}")))?;
        Ok(default)
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> HeatmapResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path.clone().unwrap_or_else(|| "heatmap.sqlite".to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            DatabaseConfig::Postgres { .. } => {
                Err(HeatmapError::validation("config is not sqlite backend"))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
        }
    }

    pub fn connection_url(&self) -> Option<&str> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => None,
            DatabaseConfig::Postgres { url } => Some(url.as_str()),
        }
    }

    pub fn limits(&self) -> LimitsConfig {
        self.limits.clone().unwrap_or_else(LimitsConfig::with_defaults)
    }

    pub fn partitioning(&self) -> PartitioningMode {
        self.partitioning.unwrap_or_default()
    }

    pub fn geometry_format(&self) -> GeometryFormat {
        self.geometry_format.unwrap_or_default()
    }
}
