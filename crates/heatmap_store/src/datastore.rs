use std::path::{Path, PathBuf};

use log::info;

use crate::{HeatmapConfig, HeatmapResult, HeatmapStore};

const DEFAULT_DB_NAME: &str = "heatmap.sqlite";

/// Read `heatmap.json` under `base`, writing a SQLite default first if absent.
pub fn load_or_init_config(base: &Path) -> HeatmapResult<HeatmapConfig> {
    HeatmapConfig::load_or_init(base, &default_sqlite_path(base))
}

/// Open the store described by the config under `base` and bring the
/// partition catalog up to date.
pub async fn open_store(base: &Path) -> HeatmapResult<HeatmapStore> {
    let config = load_or_init_config(base)?;
    let store = HeatmapStore::connect(&config, base).await?;
    info!(
        "heatmap: opened {} store under {}",
        config.backend_name(),
        base.display()
    );
    Ok(store)
}

pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_DB_NAME)
}
