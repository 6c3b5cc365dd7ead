//! Statement builders.
//!
//! Caller-supplied names arrive as validated [`Ident`]s and are quoted by
//! sea-query; every caller-supplied value is bound as a parameter.

use sea_orm::DatabaseBackend;
use sea_orm::sea_query::{
    Alias, Asterisk, ColumnDef, Condition, Expr, ExprTrait, Func, Index, IndexCreateStatement,
    InsertStatement, IntoTableRef, JoinType, Order, Query, SelectStatement, Table,
    TableCreateStatement, TableDropStatement, TableRef, Value as SeaValue,
};

use heatmap_core::predicate::{CompareOp, FilterValue, Predicate};
use heatmap_core::{
    GeofenceSpec, HeatmapError, HeatmapRequest, HeatmapResult, Ident, OpportunityRecord,
    TableName,
};

use crate::config::GeometryFormat;
use crate::db::{OpportunityColumn, ScenarioFeature, ScenarioScenarioFeature, Selected};

pub(crate) fn table_ref(name: &TableName) -> TableRef {
    match &name.schema {
        Some(schema) => {
            (Alias::new(schema.as_str()), Alias::new(name.table.as_str())).into_table_ref()
        }
        None => Alias::new(name.table.as_str()).into_table_ref(),
    }
}

fn column(name: &Ident) -> Alias {
    Alias::new(name.as_str())
}

fn geometry_expr(format: GeometryFormat, column: Expr) -> Expr {
    match format {
        GeometryFormat::Wkt => column,
        GeometryFormat::Postgis => Func::cust(Alias::new("ST_AsText")).arg(column).into(),
    }
}

/// Postgres decodes strictly by column type, so integral and numeric
/// potentials are widened to `double precision` there.
fn potential_expr(backend: DatabaseBackend, column: Expr) -> Expr {
    match backend {
        DatabaseBackend::Postgres => column.cast_as(Alias::new("double precision")),
        _ => column,
    }
}

pub(crate) fn filter_value(value: &FilterValue) -> SeaValue {
    match value {
        FilterValue::Bool(value) => (*value).into(),
        FilterValue::Int(value) => (*value).into(),
        FilterValue::Float(value) => (*value).into(),
        FilterValue::Text(value) => value.clone().into(),
    }
}

/// Translate a clause tree into a sea-query condition.
pub(crate) fn condition(predicate: &Predicate) -> HeatmapResult<Condition> {
    let cond = match predicate {
        Predicate::All { predicates } => predicates
            .iter()
            .try_fold(Condition::all(), |acc, p| Ok::<_, HeatmapError>(acc.add(condition(p)?)))?,
        Predicate::Any { predicates } => predicates
            .iter()
            .try_fold(Condition::any(), |acc, p| Ok::<_, HeatmapError>(acc.add(condition(p)?)))?,
        Predicate::Not { predicate } => condition(predicate)?.not(),
        Predicate::Compare {
            column: name,
            cmp,
            value,
        } => {
            let col = Expr::col(column(name));
            let expr = match cmp {
                CompareOp::Eq => col.eq(filter_value(value)),
                CompareOp::Ne => col.ne(filter_value(value)),
                CompareOp::Lt => col.lt(filter_value(value)),
                CompareOp::Lte => col.lte(filter_value(value)),
                CompareOp::Gt => col.gt(filter_value(value)),
                CompareOp::Gte => col.gte(filter_value(value)),
                CompareOp::Like => match value {
                    FilterValue::Text(pattern) => col.like(pattern.as_str()),
                    other => {
                        return Err(HeatmapError::validation(format!(
                            "like on column {name} needs a text pattern, got {other:?}"
                        )));
                    }
                },
            };
            Condition::all().add(expr)
        }
        Predicate::In {
            column: name,
            values,
        } => Condition::all().add(Expr::col(column(name)).is_in(values.iter().map(filter_value))),
        Predicate::IsNull { column: name } => {
            Condition::all().add(Expr::col(column(name)).is_null())
        }
        Predicate::IsNotNull { column: name } => {
            Condition::all().add(Expr::col(column(name)).is_not_null())
        }
    };
    Ok(cond)
}

/// `SELECT COUNT(*) AS cnt FROM <input> WHERE <filter>`
pub(crate) fn count_base_features(request: &HeatmapRequest) -> HeatmapResult<SelectStatement> {
    Ok(Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Selected::Cnt)
        .from(table_ref(&request.input_table))
        .cond_where(condition(&request.where_filter)?)
        .to_owned())
}

/// `SELECT id, <geom> AS geom, <potential> AS potential FROM <input> WHERE <filter>`
pub(crate) fn select_base_features(
    request: &HeatmapRequest,
    backend: DatabaseBackend,
    format: GeometryFormat,
) -> HeatmapResult<SelectStatement> {
    Ok(Query::select()
        .expr_as(Expr::col(Selected::Id), Selected::Id)
        .expr_as(
            geometry_expr(format, Expr::col(column(&request.geometry_column))),
            Selected::Geom,
        )
        .expr_as(
            potential_expr(backend, Expr::col(column(&request.potential_column))),
            Selected::Potential,
        )
        .from(table_ref(&request.input_table))
        .cond_where(condition(&request.where_filter)?)
        .order_by(Selected::Id, Order::Asc)
        .to_owned())
}

/// Edits of one scenario for one layer project, joined through the
/// scenario membership table of the customer schema.
pub(crate) fn select_scenario_edits(
    request: &HeatmapRequest,
    backend: DatabaseBackend,
    format: GeometryFormat,
    scenario_id: SeaValue,
) -> SelectStatement {
    let schema = column(&request.customer_schema);
    let sf = Alias::new("sf");
    let ssf = Alias::new("ssf");
    Query::select()
        .expr_as(Expr::col((sf.clone(), ScenarioFeature::FeatureId)), Selected::Id)
        .column((sf.clone(), ScenarioFeature::EditType))
        .expr_as(
            geometry_expr(
                format,
                Expr::col((sf.clone(), column(&request.geometry_column))),
            ),
            Selected::Geom,
        )
        .expr_as(
            potential_expr(
                backend,
                Expr::col((sf.clone(), column(&request.potential_column))),
            ),
            Selected::Potential,
        )
        .from_as((schema.clone(), ScenarioFeature::Table), sf.clone())
        .join_as(
            JoinType::InnerJoin,
            (schema, ScenarioScenarioFeature::Table),
            ssf.clone(),
            Expr::col((ssf.clone(), ScenarioScenarioFeature::ScenarioFeatureId))
                .equals((sf.clone(), ScenarioFeature::Id)),
        )
        .and_where(Expr::col((ssf, ScenarioScenarioFeature::ScenarioId)).eq(scenario_id))
        .and_where(
            Expr::col((sf.clone(), ScenarioFeature::LayerProjectId))
                .eq(request.layer_project_id.0),
        )
        .order_by((sf, ScenarioFeature::Id), Order::Asc)
        .to_owned()
}

/// `SELECT <geom> AS geom FROM <source> WHERE <filter>`
pub(crate) fn select_geofence(
    spec: &GeofenceSpec,
    format: GeometryFormat,
) -> HeatmapResult<SelectStatement> {
    Ok(Query::select()
        .expr_as(
            geometry_expr(format, Expr::col(column(&spec.geometry_column))),
            Selected::Geom,
        )
        .from(table_ref(&spec.source))
        .cond_where(condition(&spec.filter)?)
        .to_owned())
}

pub(crate) fn drop_result_table(table: &TableName) -> TableDropStatement {
    Table::drop().table(table_ref(table)).if_exists().to_owned()
}

pub(crate) fn create_result_table(table: &TableName) -> TableCreateStatement {
    Table::create()
        .table(table_ref(table))
        .col(ColumnDef::new(OpportunityColumn::Id).big_integer().not_null())
        .col(ColumnDef::new(OpportunityColumn::H3Index).big_integer().not_null())
        .col(ColumnDef::new(OpportunityColumn::MaxTraveltime).small_integer().not_null())
        .col(ColumnDef::new(OpportunityColumn::Sensitivity).double().not_null())
        .col(ColumnDef::new(OpportunityColumn::Potential).double().null())
        .col(ColumnDef::new(OpportunityColumn::ShardKey).integer().not_null())
        .to_owned()
}

pub(crate) fn lookup_index_name(table: &TableName) -> String {
    format!("idx_{}_h3_index_h3_3", table.table)
}

/// Index on `(h3_index, h3_3)`.
///
/// SQLite only accepts a bare table name after `ON`; the index lands in the
/// table's own schema.
pub(crate) fn create_lookup_index(
    backend: DatabaseBackend,
    table: &TableName,
) -> IndexCreateStatement {
    let target = match backend {
        DatabaseBackend::Sqlite => Alias::new(table.table.as_str()).into_table_ref(),
        _ => table_ref(table),
    };
    Index::create()
        .name(lookup_index_name(table))
        .table(target)
        .col(OpportunityColumn::H3Index)
        .col(OpportunityColumn::ShardKey)
        .to_owned()
}

/// One multi-row insert; callers never pass an empty slice.
pub(crate) fn insert_records(table: &TableName, records: &[OpportunityRecord]) -> InsertStatement {
    let mut insert = Query::insert()
        .into_table(table_ref(table))
        .columns([
            OpportunityColumn::Id,
            OpportunityColumn::H3Index,
            OpportunityColumn::MaxTraveltime,
            OpportunityColumn::Sensitivity,
            OpportunityColumn::Potential,
            OpportunityColumn::ShardKey,
        ])
        .to_owned();
    for record in records {
        insert.values_panic([
            record.id.0.into(),
            record.grid_cell.as_i64().into(),
            record.max_traveltime.into(),
            record.sensitivity.into(),
            record.potential.into(),
            record.shard_key.into(),
        ]);
    }
    insert
}
