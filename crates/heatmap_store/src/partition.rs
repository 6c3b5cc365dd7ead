//! Shard-key declaration for freshly created result tables.

use async_trait::async_trait;
use log::info;
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

use heatmap_core::{HeatmapError, HeatmapResult, SHARD_RESOLUTION, TableName};

use crate::db::HeatmapPartitions;
use crate::store::exec;

/// Marks a table as partitioned or distributed by one of its columns.
#[async_trait]
pub trait TablePartitioner: Send + Sync {
    async fn declare_shard_key(
        &self,
        conn: &DatabaseConnection,
        table: &TableName,
        column: &str,
    ) -> HeatmapResult<()>;
}

/// Records the shard column in the `heatmap_partitions` catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct CatalogPartitioner;

#[async_trait]
impl TablePartitioner for CatalogPartitioner {
    async fn declare_shard_key(
        &self,
        conn: &DatabaseConnection,
        table: &TableName,
        column: &str,
    ) -> HeatmapResult<()> {
        let upsert = Query::insert()
            .into_table(HeatmapPartitions::Table)
            .columns([
                HeatmapPartitions::TableName,
                HeatmapPartitions::ShardColumn,
                HeatmapPartitions::ShardResolution,
            ])
            .values_panic([
                table.to_string().into(),
                column.to_string().into(),
                i16::from(u8::from(SHARD_RESOLUTION)).into(),
            ])
            .on_conflict(
                OnConflict::column(HeatmapPartitions::TableName)
                    .update_columns([
                        HeatmapPartitions::ShardColumn,
                        HeatmapPartitions::ShardResolution,
                    ])
                    .to_owned(),
            )
            .to_owned();
        exec(conn, &upsert).await?;
        info!("heatmap: recorded shard key {table}.{column} in catalog");
        Ok(())
    }
}

/// Distributes the table across a Citus cluster.
#[derive(Clone, Copy, Debug, Default)]
pub struct CitusPartitioner;

#[async_trait]
impl TablePartitioner for CitusPartitioner {
    async fn declare_shard_key(
        &self,
        conn: &DatabaseConnection,
        table: &TableName,
        column: &str,
    ) -> HeatmapResult<()> {
        let backend = conn.get_database_backend();
        if backend != DatabaseBackend::Postgres {
            return Err(HeatmapError::validation(format!(
                "citus partitioning needs a postgres backend, got {backend:?}"
            )));
        }
        conn.query_one_raw(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT create_distributed_table($1::regclass, $2)",
            [table.to_string().into(), column.to_string().into()],
        ))
        .await?;
        info!("heatmap: distributed {table} by {column}");
        Ok(())
    }
}
