//! sherlock-test-utils: fixtures shared by the Sherlock test suites.
//!
//! The airport tenant mirrors the demo data the backend ships with:
//! an `Airport` category (one value per edge) and a `LocationType`
//! category splitting camera feeds between terminals and parking lots.

use sherlock_common::{
    CategoryInfo, DataSource, DataSourceFieldInfo, DataSourceFieldSelector, Edge, Project,
    EdgeSelectorType,
};

pub use pretty_assertions;

pub const AIRPORT: &str = "cat-airport";
pub const LOCATION_TYPE: &str = "cat-location-type";

pub fn field(name: &str, field_type: &str) -> DataSourceFieldInfo {
    DataSourceFieldInfo {
        name: name.to_string(),
        field_type: field_type.to_string(),
        mqtt_topic: format!("/demo/{name}"),
    }
}

pub fn data_source(
    id: &str,
    edge_id: &str,
    fields: Vec<DataSourceFieldInfo>,
    selectors: Vec<DataSourceFieldSelector>,
) -> DataSource {
    DataSource {
        id: id.to_string(),
        edge_id: edge_id.to_string(),
        name: format!("{id}-name"),
        kind: "Sensor".to_string(),
        sensor_model: "Model 3".to_string(),
        connection: "Secure".to_string(),
        protocol: "MQTT".to_string(),
        auth_type: "CERTIFICATE".to_string(),
        selectors,
        fields,
        updated_at: None,
    }
}

pub fn edge(id: &str, name: &str) -> Edge {
    Edge {
        id: id.to_string(),
        name: name.to_string(),
        serial_number: format!("SN-{id}"),
        connected: true,
        ..Default::default()
    }
}

pub fn category_project(id: &str, selectors: Vec<CategoryInfo>) -> Project {
    Project {
        id: id.to_string(),
        name: format!("{id}-name"),
        edge_selector_type: EdgeSelectorType::Category,
        edge_selectors: selectors,
        ..Default::default()
    }
}

pub fn explicit_project(id: &str, edge_ids: &[&str]) -> Project {
    Project {
        id: id.to_string(),
        name: format!("{id}-name"),
        edge_selector_type: EdgeSelectorType::Explicit,
        edge_ids: edge_ids.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Edges `edge-sfo` and `edge-lax`, each hosting a camera source
/// (4 image feeds: 0-2 terminal, 3 parking lot) and a temperature source
/// (2 feeds, all terminal).
pub fn airport_tenant() -> (Vec<Edge>, Vec<DataSource>) {
    let edges = vec![edge("edge-sfo", "SFO"), edge("edge-lax", "LAX"), edge("edge-idle", "IDLE")];
    let mut sources = Vec::new();
    for code in ["SFO", "LAX"] {
        let edge_id = format!("edge-{}", code.to_lowercase());
        let cams: Vec<_> = (0..4).map(|i| field(&format!("{code}Feed{i}"), "Image")).collect();
        let terminal: Vec<String> = (0..3).map(|i| format!("{code}Feed{i}")).collect();
        sources.push(data_source(
            &format!("{}-cams", code.to_lowercase()),
            &edge_id,
            cams,
            vec![
                DataSourceFieldSelector::all_fields(AIRPORT, code),
                DataSourceFieldSelector::scoped(LOCATION_TYPE, "Terminal", terminal),
                DataSourceFieldSelector::scoped(LOCATION_TYPE, "Parking Lot", [format!("{code}Feed3")]),
            ],
        ));
        let temps: Vec<_> = (0..2).map(|i| field(&format!("{code}TempFeed{i}"), "Temperature")).collect();
        sources.push(data_source(
            &format!("{}-temps", code.to_lowercase()),
            &edge_id,
            temps,
            vec![
                DataSourceFieldSelector::all_fields(AIRPORT, code),
                DataSourceFieldSelector::all_fields(LOCATION_TYPE, "Terminal"),
            ],
        ));
    }
    (edges, sources)
}

/// Canonical JSON for a list endpoint response.
pub fn json_list<T: serde::Serialize>(items: &[T]) -> serde_json::Value {
    serde_json::to_value(items).unwrap_or(serde_json::Value::Array(vec![]))
}
