use sea_orm_migration::prelude::*;

use crate::db::HeatmapPartitions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HeatmapPartitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HeatmapPartitions::TableName)
                            .string_len(127)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HeatmapPartitions::ShardColumn)
                            .string_len(63)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HeatmapPartitions::ShardResolution)
                            .small_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HeatmapPartitions::Table).to_owned())
            .await?;
        Ok(())
    }
}
