#![allow(dead_code)]

use std::collections::HashSet;

use geo_types::Point;
use heatmap_store::{
    GridCell, GridResolution, HeatmapConfig, HeatmapRequest, HeatmapResult, HeatmapStore, Ident,
    LayerProjectId, Predicate, ScenarioId, TableName,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement, Value};
use tempfile::{TempDir, tempdir};

pub const LAYER_PROJECT: i64 = 11;
pub const MUNICH: (f64, f64) = (11.5755, 48.1374);
pub const BERLIN: (f64, f64) = (13.405, 52.52);
pub const HAMBURG: (f64, f64) = (9.9937, 53.5511);

pub struct Fixture {
    pub dir: TempDir,
    pub store: HeatmapStore,
}

pub async fn fixture() -> HeatmapResult<Fixture> {
    let dir = tempdir().expect("tempdir");
    let config = HeatmapConfig::default_sqlite(dir.path().join("heatmap.sqlite").to_string_lossy());
    let store = HeatmapStore::connect(&config, dir.path()).await?;
    for ddl in [
        "CREATE TABLE poi (id INTEGER PRIMARY KEY, geom TEXT, weight REAL, category TEXT)",
        "CREATE TABLE scenario_feature (id INTEGER PRIMARY KEY, feature_id INTEGER, \
         layer_project_id INTEGER, edit_type TEXT, geom TEXT, weight REAL)",
        "CREATE TABLE scenario_scenario_feature (scenario_id TEXT, scenario_feature_id INTEGER)",
        "CREATE TABLE geofence (id INTEGER PRIMARY KEY, name TEXT, geom TEXT)",
    ] {
        execute(&store, ddl, Vec::new()).await?;
    }
    Ok(Fixture { dir, store })
}

pub async fn execute(store: &HeatmapStore, sql: &str, values: Vec<Value>) -> HeatmapResult<()> {
    store
        .connection()
        .execute_raw(Statement::from_sql_and_values(DatabaseBackend::Sqlite, sql, values))
        .await?;
    Ok(())
}

pub fn point_wkt((lng, lat): (f64, f64)) -> String {
    format!("POINT({lng} {lat})")
}

pub fn square_wkt((lng, lat): (f64, f64), half: f64) -> String {
    let (x0, x1, y0, y1) = (lng - half, lng + half, lat - half, lat + half);
    format!("POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))")
}

pub async fn seed_base(
    store: &HeatmapStore,
    id: i64,
    at: (f64, f64),
    weight: f64,
    category: &str,
) -> HeatmapResult<()> {
    execute(
        store,
        "INSERT INTO poi (id, geom, weight, category) VALUES (?, ?, ?, ?)",
        vec![id.into(), point_wkt(at).into(), weight.into(), category.into()],
    )
    .await
}

pub struct EditRow<'a> {
    pub row_id: i64,
    pub feature_id: i64,
    pub layer_project_id: i64,
    pub code: &'a str,
    pub at: Option<(f64, f64)>,
    pub weight: Option<f64>,
}

pub async fn seed_edit(
    store: &HeatmapStore,
    scenario: ScenarioId,
    edit: EditRow<'_>,
) -> HeatmapResult<()> {
    execute(
        store,
        "INSERT INTO scenario_feature (id, feature_id, layer_project_id, edit_type, geom, weight) \
         VALUES (?, ?, ?, ?, ?, ?)",
        vec![
            edit.row_id.into(),
            edit.feature_id.into(),
            edit.layer_project_id.into(),
            edit.code.into(),
            edit.at.map(point_wkt).into(),
            edit.weight.into(),
        ],
    )
    .await?;
    execute(
        store,
        "INSERT INTO scenario_scenario_feature (scenario_id, scenario_feature_id) VALUES (?, ?)",
        vec![scenario.to_uuid_string().into(), edit.row_id.into()],
    )
    .await
}

pub async fn seed_geofence(store: &HeatmapStore, id: i64, name: &str, wkt: &str) -> HeatmapResult<()> {
    execute(
        store,
        "INSERT INTO geofence (id, name, geom) VALUES (?, ?, ?)",
        vec![id.into(), name.into(), wkt.into()],
    )
    .await
}

pub fn ident(name: &str) -> Ident {
    Ident::new(name).expect("ident")
}

pub fn request(scenario: ScenarioId, result_table: &str) -> HeatmapRequest {
    HeatmapRequest {
        layer_project_id: LayerProjectId(LAYER_PROJECT),
        input_table: TableName::parse("poi").expect("table"),
        customer_schema: ident("main"),
        scenario_id: scenario,
        geofence: None,
        max_traveltime: 30,
        sensitivity: 0.5,
        potential_column: ident("weight"),
        geometry_column: ident("geom"),
        where_filter: Predicate::always(),
        result_table: TableName::parse(result_table).expect("table"),
        grid_resolution: 9,
        append_existing: false,
    }
}

pub fn cell_at((lng, lat): (f64, f64), resolution: GridResolution) -> GridCell {
    GridCell::for_point(Point::new(lng, lat), resolution).expect("cell")
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub id: i64,
    pub h3_index: i64,
    pub max_traveltime: i64,
    pub sensitivity: f64,
    pub potential: Option<f64>,
    pub h3_3: i64,
}

pub async fn read_output(store: &HeatmapStore, table: &str) -> HeatmapResult<Vec<OutputRow>> {
    let rows = store
        .connection()
        .query_all_raw(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!(
                "SELECT id, h3_index, max_traveltime, sensitivity, potential, h3_3 \
                 FROM \"{table}\" ORDER BY id"
            ),
        ))
        .await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(OutputRow {
            id: row.try_get("", "id")?,
            h3_index: row.try_get("", "h3_index")?,
            max_traveltime: row.try_get("", "max_traveltime")?,
            sensitivity: row.try_get("", "sensitivity")?,
            potential: row.try_get("", "potential")?,
            h3_3: row.try_get("", "h3_3")?,
        });
    }
    Ok(out)
}

async fn names(store: &HeatmapStore, sql: &str, values: Vec<Value>) -> HeatmapResult<HashSet<String>> {
    let rows = store
        .connection()
        .query_all_raw(Statement::from_sql_and_values(DatabaseBackend::Sqlite, sql, values))
        .await?;
    let mut names = HashSet::new();
    for row in rows {
        let name: String = row.try_get("", "name")?;
        names.insert(name);
    }
    Ok(names)
}

pub async fn list_tables(store: &HeatmapStore) -> HeatmapResult<HashSet<String>> {
    names(
        store,
        "SELECT name FROM sqlite_master WHERE type = 'table'",
        Vec::new(),
    )
    .await
}

pub async fn list_indexes(store: &HeatmapStore, table: &str) -> HeatmapResult<HashSet<String>> {
    names(
        store,
        "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?",
        vec![table.into()],
    )
    .await
}
