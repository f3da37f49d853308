//! Typed access to the `/v1` collections.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sherlock_common::entities::{
    Application, Category, CategoryInfo, CloudCreds, ContainerRegistry, DataSource, DataStream,
    Edge, Event, LogEntry, Project, Script, SoftwareUpdate, SoftwareUpdateBatch,
    SoftwareUpdateKind, User,
};
use sherlock_common::{Result, SherlockError};
use sherlock_selectors::{affected_edges, project_edge_count, AffectedEdges};
use tracing::{debug, instrument};

use crate::client::ApiClient;

/// A backend collection living at `/v1/{PATH}`.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    const PATH: &'static str;
}

/// A collection that can also be listed per project at `/v1/projects/{id}/{PATH}`.
pub trait ProjectScoped: Resource {}

macro_rules! resource {
    ($ty:ty, $path:literal) => {
        impl Resource for $ty {
            const PATH: &'static str = $path;
        }
    };
}

resource!(Edge, "edges");
resource!(DataSource, "datasources");
resource!(DataStream, "datastreams");
resource!(Category, "categories");
resource!(Project, "projects");
resource!(Application, "applications");
resource!(Script, "scripts");
resource!(User, "users");
resource!(CloudCreds, "cloudcreds");
resource!(ContainerRegistry, "containerregistries");
resource!(LogEntry, "logs/entries");
resource!(Event, "events");

impl ProjectScoped for Edge {}
impl ProjectScoped for DataSource {}
impl ProjectScoped for DataStream {}

/// Every listable collection name, for command-line dispatch.
pub const RESOURCE_NAMES: &[&str] = &[
    "edges",
    "datasources",
    "datastreams",
    "categories",
    "projects",
    "applications",
    "scripts",
    "users",
    "cloudcreds",
    "containerregistries",
    "logs",
    "events",
];

/// Path below `/v1` for a collection name from `RESOURCE_NAMES`.
fn collection_path(name: &str) -> &str {
    match name {
        "logs" => LogEntry::PATH,
        other => other,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateResponse {
    #[serde(rename = "_id")]
    pub id: String,
}

/// Paged list envelope of the `/v1.0` endpoints.
#[derive(Debug, Deserialize)]
struct ListPayload<T> {
    #[serde(default)]
    result: Option<Vec<T>>,
}

impl ApiClient {
    pub async fn list<R: Resource>(&self) -> Result<Vec<R>> {
        let items: Option<Vec<R>> = self.get_json(&format!("/v1/{}", R::PATH)).await?;
        Ok(items.unwrap_or_default())
    }

    pub async fn get<R: Resource>(&self, id: &str) -> Result<R> {
        let item: Option<R> = self.get_json(&format!("/v1/{}/{}", R::PATH, id)).await?;
        item.ok_or_else(|| SherlockError::NotFound(format!("{} {}", R::PATH, id)))
    }

    pub async fn create<R: Resource>(&self, item: &R) -> Result<String> {
        let resp: CreateResponse = self.post_json(&format!("/v1/{}", R::PATH), item).await?;
        debug!(resource = R::PATH, id = %resp.id, "created");
        Ok(resp.id)
    }

    pub async fn update<R: Resource>(&self, id: &str, item: &R) -> Result<()> {
        let _: serde_json::Value = self.put_json(&format!("/v1/{}/{}", R::PATH, id), item).await?;
        Ok(())
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> Result<()> {
        let _: serde_json::Value = self.delete_json(&format!("/v1/{}/{}", R::PATH, id)).await?;
        Ok(())
    }

    /// Untyped listing by collection name.
    pub async fn list_raw(&self, name: &str) -> Result<Vec<serde_json::Value>> {
        if !RESOURCE_NAMES.contains(&name) {
            return Err(SherlockError::Validation(format!("unknown resource '{name}'")));
        }
        let items: Option<Vec<serde_json::Value>> =
            self.get_json(&format!("/v1/{}", collection_path(name))).await?;
        Ok(items.unwrap_or_default())
    }

    pub async fn list_for_project<R: ProjectScoped>(&self, project_id: &str) -> Result<Vec<R>> {
        let items: Option<Vec<R>> = self
            .get_json(&format!("/v1/projects/{}/{}", project_id, R::PATH))
            .await?;
        Ok(items.unwrap_or_default())
    }

    /// Edges a data stream with `origin_selectors` would draw from inside a
    /// project. Data sources and edges are fetched concurrently.
    #[instrument(skip(self, origin_selectors))]
    pub async fn affected_edges_for_project(
        &self,
        project_id: &str,
        origin_selectors: &[CategoryInfo],
        data_type: &str,
    ) -> Result<AffectedEdges> {
        let (sources, edges) = tokio::try_join!(
            self.list_for_project::<DataSource>(project_id),
            self.list_for_project::<Edge>(project_id),
        )?;
        Ok(affected_edges(&sources, &edges, origin_selectors, data_type))
    }

    /// Every project with the number of edges it spans.
    pub async fn project_edge_counts(&self) -> Result<Vec<(Project, usize)>> {
        let (projects, sources) =
            tokio::try_join!(self.list::<Project>(), self.list::<DataSource>())?;
        Ok(projects
            .into_iter()
            .map(|p| {
                let count = project_edge_count(&p, &sources);
                (p, count)
            })
            .collect())
    }

    /// One OTA download or upgrade batch.
    pub async fn software_update_batch(
        &self,
        kind: SoftwareUpdateKind,
        batch_id: &str,
    ) -> Result<SoftwareUpdateBatch> {
        let path = format!("/v1.0/softwareupdates/{}/{}", kind.collection(), batch_id);
        let batch: Option<SoftwareUpdateBatch> = self.get_json(&path).await?;
        batch.ok_or_else(|| SherlockError::NotFound(format!("software update batch {batch_id}")))
    }

    /// Per-edge progress within an OTA batch.
    pub async fn software_update_edges(
        &self,
        kind: SoftwareUpdateKind,
        batch_id: &str,
    ) -> Result<Vec<SoftwareUpdate>> {
        let path = format!("/v1.0/softwareupdates/{}/{}/servicedomains", kind.collection(), batch_id);
        let payload: Option<ListPayload<SoftwareUpdate>> = self.get_json(&path).await?;
        Ok(payload.and_then(|p| p.result).unwrap_or_default())
    }
}
