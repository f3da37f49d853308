//! Resource types exchanged with the Sherlock REST API.
//! Field names follow the backend's camelCase JSON.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SherlockError};

/// Scope value meaning "every field of the data source".
pub const SCOPE_ALL: &str = "__ALL__";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A choice of one value from a category, e.g. `Airport = SFO`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: String,
    pub value: String,
}

impl CategoryInfo {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self { id: id.into(), value: value.into() }
    }
}

/// A tenant-defined taxonomy dimension with an enumerated value set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Category {
    /// Normalize before create/update: trims name and values. Rejects an
    /// empty name, an empty value set, blank values and case-insensitive
    /// duplicates. Nothing is modified unless validation succeeds.
    pub fn validate(&mut self) -> Result<()> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(SherlockError::Validation("category name is empty".to_string()));
        }
        if self.values.is_empty() {
            return Err(SherlockError::Validation("category has no values".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        let mut values = Vec::with_capacity(self.values.len());
        for v in &self.values {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Err(SherlockError::Validation("category value is empty".to_string()));
            }
            if !seen.insert(trimmed.to_lowercase()) {
                return Err(SherlockError::Validation(format!(
                    "duplicate category value: {trimmed}"
                )));
            }
            values.push(trimmed.to_string());
        }

        self.name = name;
        self.values = values;
        Ok(())
    }

    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

// ---------------------------------------------------------------------------
// Data source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceFieldInfo {
    pub name: String,
    #[serde(default)]
    pub field_type: String,
    #[serde(default)]
    pub mqtt_topic: String,
}

/// A category value bound to a data source, restricted to the fields in
/// `scope` (or every field when scope is `["__ALL__"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceFieldSelector {
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl DataSourceFieldSelector {
    pub fn all_fields(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self { id: id.into(), value: value.into(), scope: vec![SCOPE_ALL.to_string()] }
    }

    pub fn scoped<I, S>(id: impl Into<String>, value: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            value: value.into(),
            scope: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_all_scope(&self) -> bool {
        self.scope.len() == 1 && self.scope[0] == SCOPE_ALL
    }

    pub fn category_info(&self) -> CategoryInfo {
        CategoryInfo::new(self.id.clone(), self.value.clone())
    }
}

/// A sensor or gateway endpoint hosted on an edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub edge_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sensor_model: String,
    #[serde(default)]
    pub connection: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub auth_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub selectors: Vec<DataSourceFieldSelector>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fields: Vec<DataSourceFieldInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DataSource {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Data stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStream {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub origin_selectors: Vec<CategoryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    #[serde(default)]
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_creds_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub enable_sampling: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_interval: Option<f64>,
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub subnet: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<CategoryInfo>,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeSelectorType {
    #[default]
    Category,
    Explicit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUserInfo {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cloud_credential_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub docker_profile_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<ProjectUserInfo>,
    #[serde(default)]
    pub edge_selector_type: EdgeSelectorType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub edge_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub edge_selectors: Vec<CategoryInfo>,
}

// ---------------------------------------------------------------------------
// Remaining list-view resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub edge_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub edge_selectors: Vec<CategoryInfo>,
    #[serde(default)]
    pub yaml_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCreds {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRegistry {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub edge_id: String,
    #[serde(default)]
    pub batch_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Roll-up of the entries in one log collection batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogBatchStatus {
    Collecting,
    PartialFailure,
    Success,
    Failed,
}

impl LogBatchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LogBatchStatus::Collecting => "Collecting",
            LogBatchStatus::PartialFailure => "Partial Failure",
            LogBatchStatus::Success => "Success",
            LogBatchStatus::Failed => "Failed",
        }
    }

    /// No further polling is needed.
    pub fn is_settled(&self) -> bool {
        !matches!(self, LogBatchStatus::Collecting)
    }
}

/// Status of a batch from its entries' statuses. Any `PENDING` entry means
/// the batch is still collecting; otherwise a mix of `SUCCESS` and `FAILED`
/// is a partial failure. `None` when no entry carries a known status.
pub fn log_batch_status<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Option<LogBatchStatus> {
    let (mut pending, mut success, mut failed) = (false, false, false);
    for entry in entries {
        match entry.status.as_str() {
            "PENDING" => pending = true,
            "SUCCESS" => success = true,
            "FAILED" => failed = true,
            _ => {}
        }
    }
    match (pending, success, failed) {
        (true, _, _) => Some(LogBatchStatus::Collecting),
        (false, true, true) => Some(LogBatchStatus::PartialFailure),
        (false, true, false) => Some(LogBatchStatus::Success),
        (false, false, true) => Some(LogBatchStatus::Failed),
        (false, false, false) => None,
    }
}

/// Log entries grouped by collection batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogBatch {
    pub batch_id: String,
    /// `Log_` followed by the last dash-separated segment of the batch id.
    pub name: String,
    pub entry_count: usize,
    pub edge_ids: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub status: Option<LogBatchStatus>,
}

/// Group entries by batch, newest batch first.
pub fn log_batches(entries: &[LogEntry]) -> Vec<LogBatch> {
    let mut by_batch: Vec<(&str, Vec<&LogEntry>)> = Vec::new();
    for entry in entries {
        match by_batch.iter_mut().find(|(id, _)| *id == entry.batch_id) {
            Some((_, group)) => group.push(entry),
            None => by_batch.push((entry.batch_id.as_str(), vec![entry])),
        }
    }

    let mut batches: Vec<LogBatch> = by_batch
        .into_iter()
        .map(|(batch_id, group)| {
            let suffix = batch_id.rsplit('-').next().unwrap_or_default();
            let mut edge_ids: Vec<String> = Vec::new();
            for e in &group {
                if !e.edge_id.is_empty() && !edge_ids.contains(&e.edge_id) {
                    edge_ids.push(e.edge_id.clone());
                }
            }
            LogBatch {
                batch_id: batch_id.to_string(),
                name: format!("Log_{suffix}"),
                entry_count: group.len(),
                edge_ids,
                created_at: group.iter().filter_map(|e| e.created_at).max(),
                status: log_batch_status(group.iter().copied()),
            }
        })
        .collect();
    batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    batches
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Lifecycle state of an OTA download or upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoftwareUpdateState {
    #[default]
    Download,
    Downloading,
    DownloadCancel,
    DownloadCancelled,
    DownloadFailed,
    Downloaded,
    Upgrade,
    Upgrading,
    UpgradeFailed,
    Upgraded,
    #[serde(other)]
    Unknown,
}

impl SoftwareUpdateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoftwareUpdateState::Download => "DOWNLOAD",
            SoftwareUpdateState::Downloading => "DOWNLOADING",
            SoftwareUpdateState::DownloadCancel => "DOWNLOAD_CANCEL",
            SoftwareUpdateState::DownloadCancelled => "DOWNLOAD_CANCELLED",
            SoftwareUpdateState::DownloadFailed => "DOWNLOAD_FAILED",
            SoftwareUpdateState::Downloaded => "DOWNLOADED",
            SoftwareUpdateState::Upgrade => "UPGRADE",
            SoftwareUpdateState::Upgrading => "UPGRADING",
            SoftwareUpdateState::UpgradeFailed => "UPGRADE_FAILED",
            SoftwareUpdateState::Upgraded => "UPGRADED",
            SoftwareUpdateState::Unknown => "UNKNOWN",
        }
    }

    /// False while the backend still drives the update (including a
    /// requested but unacknowledged download cancel).
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            SoftwareUpdateState::Download
                | SoftwareUpdateState::Downloading
                | SoftwareUpdateState::DownloadCancel
                | SoftwareUpdateState::Upgrade
                | SoftwareUpdateState::Upgrading
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SoftwareUpdateState::DownloadFailed | SoftwareUpdateState::UpgradeFailed)
    }
}

impl std::fmt::Display for SoftwareUpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which OTA pipeline a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoftwareUpdateKind {
    Download,
    Upgrade,
}

impl SoftwareUpdateKind {
    /// Collection segment under `/v1.0/softwareupdates`.
    pub fn collection(&self) -> &'static str {
        match self {
            SoftwareUpdateKind::Download => "downloads",
            SoftwareUpdateKind::Upgrade => "upgrades",
        }
    }
}

/// A download or upgrade batch across one or more edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareUpdateBatch {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SoftwareUpdateKind>,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub state: SoftwareUpdateState,
    #[serde(default)]
    pub progress: u32,
    /// Minutes remaining.
    #[serde(default)]
    pub eta: u32,
    /// Number of edges in each state.
    #[serde(default)]
    pub stats: HashMap<SoftwareUpdateState, u32>,
}

impl SoftwareUpdateBatch {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Progress of one edge within an update batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareUpdate {
    #[serde(default)]
    pub batch_id: String,
    #[serde(default, rename = "svcDomainId")]
    pub edge_id: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub state: SoftwareUpdateState,
    #[serde(default)]
    pub progress: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SoftwareUpdate {
    /// True once the edge has left the download/upgrade pipeline.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// The backend sends `null` for empty lists on some endpoints.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
