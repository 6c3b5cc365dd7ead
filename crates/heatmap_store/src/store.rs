use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use sea_orm::sea_query::{
    Expr, ExprTrait, PostgresQueryBuilder, Query, QueryStatementWriter, SchemaStatementBuilder,
    SqliteQueryBuilder, Value as SeaValue,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    Statement, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use sea_orm_migration::prelude::Iden;

use heatmap_core::{
    BuildMode, BuildReport, EditType, Feature, FeatureGeometry, FeatureId, GeofenceFilter,
    GeofenceRegion, GeofenceSpec, HeatmapError, HeatmapRequest, HeatmapResult, Ident,
    OpportunityRecord, OpportunityTableApi, RequestLimits, ScenarioEdit, ScenarioId, TableName,
    materialize, resolve_overlay,
};

use crate::config::{GeometryFormat, PartitioningMode};
use crate::db::{HeatmapPartitions, OpportunityColumn, ScenarioFeature, Selected};
use crate::migration::Migrator;
use crate::partition::{CatalogPartitioner, CitusPartitioner, TablePartitioner};
use crate::query;
use crate::{DatabaseConfig, HeatmapConfig};

#[derive(Clone)]
pub struct HeatmapStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
    limits: StoreLimits,
    geometry_format: GeometryFormat,
    partitioner: Arc<dyn TablePartitioner>,
}

#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    pub distributed_tables: bool,
    pub spatial_functions: bool,
}

#[derive(Clone, Copy, Debug)]
struct StoreLimits {
    request: RequestLimits,
    insert_batch_size: usize,
}

impl StoreLimits {
    fn from_config(config: &HeatmapConfig) -> Self {
        let limits = config.limits();
        Self {
            request: limits.request_limits(),
            insert_batch_size: limits.insert_batch_size(),
        }
    }
}

impl HeatmapStore {
    pub async fn connect(config: &HeatmapConfig, base_dir: &Path) -> HeatmapResult<Self> {
        let url = build_connection_url(config, base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        let conn = Database::connect(options).await.map_err(HeatmapError::from)?;
        let backend = conn.get_database_backend();
        let partitioner: Arc<dyn TablePartitioner> = match config.partitioning() {
            PartitioningMode::Catalog => Arc::new(CatalogPartitioner),
            PartitioningMode::Citus => Arc::new(CitusPartitioner),
        };
        let store = Self {
            conn,
            backend,
            limits: StoreLimits::from_config(config),
            geometry_format: config.geometry_format(),
            partitioner,
        };
        let capabilities = store.capabilities();
        if config.partitioning() == PartitioningMode::Citus && !capabilities.distributed_tables {
            return Err(HeatmapError::validation(format!(
                "citus partitioning is not available on the {} backend",
                config.backend_name()
            )));
        }
        if store.geometry_format == GeometryFormat::Postgis && !capabilities.spatial_functions {
            return Err(HeatmapError::validation(format!(
                "postgis geometry format is not available on the {} backend",
                config.backend_name()
            )));
        }
        Migrator::up(&store.conn, None)
            .await
            .map_err(HeatmapError::from)?;
        Ok(store)
    }

    pub async fn connect_sqlite(path: &Path) -> HeatmapResult<Self> {
        let config = HeatmapConfig::default_sqlite(path.to_string_lossy());
        Self::connect(&config, path.parent().unwrap_or_else(|| Path::new("."))).await
    }

    /// Swap the shard-key collaborator used by fresh builds.
    pub fn with_partitioner(mut self, partitioner: Arc<dyn TablePartitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        match self.backend {
            DatabaseBackend::Postgres => BackendCapabilities {
                distributed_tables: true,
                spatial_functions: true,
            },
            _ => BackendCapabilities {
                distributed_tables: false,
                spatial_functions: false,
            },
        }
    }

    /// Schema that unqualified table names resolve to.
    pub fn default_schema(&self) -> Ident {
        match self.backend {
            DatabaseBackend::Postgres => Ident::from_static("public"),
            _ => Ident::from_static("main"),
        }
    }

    /// Shard column recorded for `table` by the catalog partitioner.
    pub async fn shard_column_for(&self, table: &TableName) -> HeatmapResult<Option<String>> {
        let select = Query::select()
            .column(HeatmapPartitions::ShardColumn)
            .from(HeatmapPartitions::Table)
            .and_where(Expr::col(HeatmapPartitions::TableName).eq(table.to_string()))
            .to_owned();
        let Some(row) = query_one(&self.conn, &select).await? else {
            return Ok(None);
        };
        let column: String = row.try_get("", &col_name(HeatmapPartitions::ShardColumn))?;
        Ok(Some(column))
    }

    async fn count_base_features(&self, request: &HeatmapRequest) -> HeatmapResult<u64> {
        let select = query::count_base_features(request)?;
        let row = query_one(&self.conn, &select).await?;
        let count: i64 = match row {
            Some(row) => row.try_get("", &col_name(Selected::Cnt))?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn fetch_base_features(&self, request: &HeatmapRequest) -> HeatmapResult<Vec<Feature>> {
        let select = query::select_base_features(request, self.backend, self.geometry_format)?;
        let rows = query_all(&self.conn, &select).await?;
        rows.iter()
            .map(|row| {
                let id = read_feature_id(row)?;
                let wkt: Option<String> = row.try_get("", &col_name(Selected::Geom))?;
                let wkt = wkt.ok_or_else(|| {
                    HeatmapError::geometry(format!(
                        "base feature {id} in {} has no geometry",
                        request.input_table
                    ))
                })?;
                Ok(Feature {
                    id,
                    geometry: FeatureGeometry::from_wkt(&wkt)?,
                    potential: read_potential(self.backend, row)?,
                })
            })
            .collect()
    }

    async fn fetch_scenario_edits(
        &self,
        request: &HeatmapRequest,
    ) -> HeatmapResult<Vec<ScenarioEdit>> {
        let scenario = scenario_value(self.backend, request.scenario_id);
        let select =
            query::select_scenario_edits(request, self.backend, self.geometry_format, scenario);
        let rows = query_all(&self.conn, &select).await?;
        rows.iter()
            .map(|row| {
                let edit_type: String = row.try_get("", &col_name(ScenarioFeature::EditType))?;
                let wkt: Option<String> = row.try_get("", &col_name(Selected::Geom))?;
                Ok(ScenarioEdit {
                    feature_id: read_feature_id(row)?,
                    edit_type: edit_type.parse::<EditType>()?,
                    geometry: wkt.as_deref().map(FeatureGeometry::from_wkt).transpose()?,
                    potential: read_potential(self.backend, row)?,
                })
            })
            .collect()
    }

    async fn load_geofence(&self, spec: Option<&GeofenceSpec>) -> HeatmapResult<GeofenceFilter> {
        let Some(spec) = spec else {
            return Ok(GeofenceFilter::none());
        };
        let select = query::select_geofence(spec, self.geometry_format)?;
        let rows = query_all(&self.conn, &select).await?;
        let mut geometries = Vec::with_capacity(rows.len());
        for row in &rows {
            let wkt: Option<String> = row.try_get("", &col_name(Selected::Geom))?;
            if let Some(wkt) = wkt {
                geometries.push(FeatureGeometry::from_wkt(&wkt)?);
            }
        }
        if geometries.is_empty() {
            debug!("heatmap: geofence {} selected no geometries", spec.source);
        }
        Ok(GeofenceFilter::region(GeofenceRegion::new(
            geometries,
            spec.buffer_distance,
        )))
    }

    async fn prepare_fresh_table(&self, table: &TableName) -> HeatmapResult<()> {
        exec_schema(&self.conn, &query::drop_result_table(table)).await?;
        exec_schema(&self.conn, &query::create_result_table(table)).await?;
        self.partitioner
            .declare_shard_key(&self.conn, table, &col_name(OpportunityColumn::ShardKey))
            .await?;
        info!("heatmap: prepared result table {table}");
        Ok(())
    }

    async fn insert_records(
        &self,
        table: &TableName,
        records: &[OpportunityRecord],
    ) -> HeatmapResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.begin().await?;
        for batch in records.chunks(self.limits.insert_batch_size) {
            exec(&tx, &query::insert_records(table, batch)).await?;
        }
        tx.commit().await?;
        Ok(records.len() as u64)
    }

    async fn create_lookup_index(&self, table: &TableName) -> HeatmapResult<()> {
        exec_schema(&self.conn, &query::create_lookup_index(self.backend, table)).await?;
        info!(
            "heatmap: built index {} on {table}",
            query::lookup_index_name(table)
        );
        Ok(())
    }
}

#[async_trait]
impl OpportunityTableApi for HeatmapStore {
    async fn build_opportunity_table(&self, request: HeatmapRequest) -> HeatmapResult<BuildReport> {
        let validated = request.validate(&self.limits.request, &self.default_schema())?;
        let request = validated.request();
        let mode = if validated.is_append() {
            BuildMode::Append
        } else {
            BuildMode::Fresh
        };

        let base_count = self.count_base_features(request).await?;
        if base_count > self.limits.request.max_feature_count {
            return Err(HeatmapError::validation(format!(
                "{base_count} features in {} exceed the limit of {}",
                request.input_table, self.limits.request.max_feature_count
            )));
        }

        let base = self.fetch_base_features(request).await?;
        let edits = self.fetch_scenario_edits(request).await?;
        debug!(
            "heatmap: {} base features, {} scenario edits for scenario {}",
            base.len(),
            edits.len(),
            request.scenario_id
        );
        let merged = resolve_overlay(base, edits)?;
        let geofence = self.load_geofence(request.geofence.as_ref()).await?;
        let kept = geofence.apply(merged);
        let records = materialize(&kept, &validated.materialize_params())?;

        if mode == BuildMode::Fresh {
            info!(
                "heatmap: fresh build of {} drops its existing contents",
                request.result_table
            );
            self.prepare_fresh_table(&request.result_table).await?;
        }
        let rows_written = self.insert_records(&request.result_table, &records).await?;
        match mode {
            BuildMode::Fresh => self.create_lookup_index(&request.result_table).await?,
            BuildMode::Append if rows_written == 0 => {
                warn!("heatmap: append to {} wrote no rows", request.result_table);
            }
            BuildMode::Append => {}
        }
        info!(
            "heatmap: wrote {rows_written} rows to {} at resolution {}",
            request.result_table,
            validated.resolution()
        );
        Ok(BuildReport { mode, rows_written })
    }
}

fn scenario_value(backend: DatabaseBackend, scenario: ScenarioId) -> SeaValue {
    match backend {
        DatabaseBackend::Postgres => SeaValue::Uuid(Some(scenario.as_uuid())),
        _ => SeaValue::String(Some(scenario.to_uuid_string())),
    }
}

fn read_feature_id(row: &QueryResult) -> HeatmapResult<FeatureId> {
    let column = col_name(Selected::Id);
    match row.try_get::<i64>("", &column) {
        Ok(value) => Ok(FeatureId(value)),
        Err(_) => Ok(FeatureId(i64::from(row.try_get::<i32>("", &column)?))),
    }
}

/// Postgres selects already cast the potential to `double precision`;
/// SQLite hands back whatever affinity the stored value has.
fn read_potential(backend: DatabaseBackend, row: &QueryResult) -> HeatmapResult<Option<f64>> {
    let column = col_name(Selected::Potential);
    if backend == DatabaseBackend::Postgres {
        return Ok(row.try_get::<Option<f64>>("", &column)?);
    }
    match row.try_get::<Option<f64>>("", &column) {
        Ok(value) => Ok(value),
        Err(_) => Ok(row
            .try_get::<Option<i64>>("", &column)?
            .map(|value| value as f64)),
    }
}

pub(crate) fn col_name(column: impl Iden) -> String {
    column.to_string()
}

fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        _ => stmt.build(SqliteQueryBuilder),
    }
}

fn build_schema_stmt<S: SchemaStatementBuilder>(backend: DatabaseBackend, stmt: &S) -> String {
    match backend {
        DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        _ => stmt.build(SqliteQueryBuilder),
    }
}

pub(crate) async fn exec<C, S>(conn: &C, stmt: &S) -> HeatmapResult<()>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    conn.execute_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(())
}

async fn exec_schema<C, S>(conn: &C, stmt: &S) -> HeatmapResult<()>
where
    C: ConnectionTrait,
    S: SchemaStatementBuilder,
{
    let backend = conn.get_database_backend();
    let sql = build_schema_stmt(backend, stmt);
    conn.execute_raw(Statement::from_string(backend, sql)).await?;
    Ok(())
}

async fn query_all<C, S>(conn: &C, stmt: &S) -> HeatmapResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let rows = conn
        .query_all_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

async fn query_one<C, S>(conn: &C, stmt: &S) -> HeatmapResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}

fn build_connection_url(config: &HeatmapConfig, base_dir: &Path) -> HeatmapResult<String> {
    match &config.database {
        DatabaseConfig::Sqlite { .. } => {
            let path = config.sqlite_path(base_dir)?;
            Ok(format!("sqlite://{}?mode=rwc", path.display()))
        }
        DatabaseConfig::Postgres { url } => Ok(url.clone()),
    }
}
