//! Edge-level aggregation of selector matches.
//!
//! Used when creating a data stream (which edges and how many sensors the
//! stream would tap) and when listing projects (how many edges a
//! category-scoped project spans).

use std::collections::HashSet;

use serde::Serialize;
use sherlock_common::{CategoryInfo, DataSource, Edge, EdgeSelectorType, Project};
use tracing::debug;

use crate::matching::{matches_origin_selectors, matching_field_count};

/// Match totals for one edge.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeImpact {
    pub edge: Edge,
    pub data_source_count: usize,
    pub sensor_count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AffectedEdges {
    /// Edges with at least one matching data source, in input order.
    pub edges: Vec<EdgeImpact>,
    pub data_source_count: usize,
    pub sensor_count: usize,
}

impl AffectedEdges {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Edges whose data sources match `origin_selectors`, with per-edge and total
/// data source and sensor counts.
///
/// An empty selector list affects nothing. Data sources on edges missing
/// from `edges` still count towards the totals.
pub fn affected_edges(
    data_sources: &[DataSource],
    edges: &[Edge],
    origin_selectors: &[CategoryInfo],
    data_type: &str,
) -> AffectedEdges {
    if origin_selectors.is_empty() {
        return AffectedEdges::default();
    }

    let mut impacts: Vec<EdgeImpact> = edges
        .iter()
        .map(|edge| EdgeImpact { edge: edge.clone(), data_source_count: 0, sensor_count: 0 })
        .collect();
    let mut result = AffectedEdges::default();

    for ds in data_sources
        .iter()
        .filter(|ds| matches_origin_selectors(ds, origin_selectors, data_type))
    {
        let sensors = matching_field_count(ds, origin_selectors, data_type);
        if let Some(impact) = impacts.iter_mut().find(|i| i.edge.id == ds.edge_id) {
            impact.data_source_count += 1;
            impact.sensor_count += sensors;
        }
        result.data_source_count += 1;
        result.sensor_count += sensors;
    }

    result.edges = impacts.into_iter().filter(|i| i.data_source_count > 0).collect();
    debug!(
        edges = result.edges.len(),
        data_sources = result.data_source_count,
        sensors = result.sensor_count,
        "computed affected edges"
    );
    result
}

/// Number of edges a project spans.
pub fn project_edge_count(project: &Project, data_sources: &[DataSource]) -> usize {
    match project.edge_selector_type {
        EdgeSelectorType::Explicit => project.edge_ids.len(),
        EdgeSelectorType::Category => data_sources
            .iter()
            .filter(|ds| matches_origin_selectors(ds, &project.edge_selectors, ""))
            .map(|ds| ds.edge_id.as_str())
            .collect::<HashSet<_>>()
            .len(),
    }
}
