use sea_orm::sea_query;
use sea_orm_migration::prelude::Iden;

/// Shard-key catalog written by [`crate::partition::CatalogPartitioner`].
#[derive(Iden, Clone, Copy)]
pub enum HeatmapPartitions {
    Table,
    TableName,
    ShardColumn,
    ShardResolution,
}

/// Columns of a materialised opportunity table.
#[derive(Iden, Clone, Copy)]
pub enum OpportunityColumn {
    Id,
    H3Index,
    MaxTraveltime,
    Sensitivity,
    Potential,
    #[iden = "h3_3"]
    ShardKey,
}

#[derive(Iden, Clone, Copy)]
pub enum ScenarioFeature {
    Table,
    Id,
    FeatureId,
    LayerProjectId,
    EditType,
}

#[derive(Iden, Clone, Copy)]
pub enum ScenarioScenarioFeature {
    Table,
    ScenarioId,
    ScenarioFeatureId,
}

/// Column aliases used in selects against caller-named tables.
#[derive(Iden, Clone, Copy)]
pub enum Selected {
    Id,
    Geom,
    Potential,
    Cnt,
}
