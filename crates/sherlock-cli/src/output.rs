//! Plain-text tables for terminal output.

use sherlock_common::entities::{
    Application, Category, DataSource, DataStream, Edge, LogBatch, Project, SoftwareUpdate, User,
};
use sherlock_console::Row;
use sherlock_selectors::AffectedEdges;

/// A row that can be printed as table cells.
pub trait Printable: Row {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

impl Printable for Edge {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "SERIAL", "IP", "CONNECTED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.serial_number.clone(),
            self.ip_address.clone(),
            self.connected.to_string(),
        ]
    }
}

impl Printable for DataSource {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "EDGE", "TYPE", "PROTOCOL", "FIELDS"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.edge_id.clone(),
            self.kind.clone(),
            self.protocol.clone(),
            self.fields.len().to_string(),
        ]
    }
}

impl Printable for DataStream {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "DATA TYPE", "ORIGIN", "DESTINATION"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.data_type.clone(),
            self.origin.clone(),
            self.destination.clone(),
        ]
    }
}

impl Printable for Project {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "EDGE SELECTION", "USERS"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            format!("{:?}", self.edge_selector_type),
            self.users.len().to_string(),
        ]
    }
}

impl Printable for Category {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "PURPOSE", "VALUES"];

    fn cells(&self) -> Vec<String> {
        vec![self.id.clone(), self.name.clone(), self.purpose.clone(), self.values.join(", ")]
    }
}

impl Printable for Application {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "DESCRIPTION", "EDGES"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.description.clone(),
            self.edge_ids.len().to_string(),
        ]
    }
}

impl Printable for User {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "EMAIL", "ROLE"];

    fn cells(&self) -> Vec<String> {
        vec![self.id.clone(), self.name.clone(), self.email.clone(), self.role.clone()]
    }
}

/// Render rows as left-aligned columns separated by two spaces.
pub fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers.to_vec());
    for row in rows {
        out.push('\n');
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}

pub fn render_rows<'a, R: Printable + 'a>(rows: impl IntoIterator<Item = &'a R>) -> String {
    let cells: Vec<Vec<String>> = rows.into_iter().map(|r| r.cells()).collect();
    render(R::HEADERS, &cells)
}

pub fn render_affected(result: &AffectedEdges) -> String {
    let rows: Vec<Vec<String>> = result
        .edges
        .iter()
        .map(|i| {
            vec![
                i.edge.id.clone(),
                i.edge.name.clone(),
                i.data_source_count.to_string(),
                i.sensor_count.to_string(),
            ]
        })
        .collect();
    let mut out = render(&["EDGE", "NAME", "DATA SOURCES", "SENSORS"], &rows);
    out.push_str(&format!(
        "\n\n{} edge(s), {} data source(s), {} sensor(s)",
        result.edges.len(),
        result.data_source_count,
        result.sensor_count
    ));
    out
}

pub fn render_log_batches(batches: &[LogBatch]) -> String {
    let rows: Vec<Vec<String>> = batches
        .iter()
        .map(|b| {
            vec![
                b.name.clone(),
                b.batch_id.clone(),
                b.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                b.edge_ids.len().to_string(),
                b.status.map(|s| s.label()).unwrap_or("-").to_string(),
            ]
        })
        .collect();
    render(&["NAME", "BATCH", "CREATED", "EDGES", "STATUS"], &rows)
}

pub fn render_software_updates(updates: &[SoftwareUpdate]) -> String {
    let rows: Vec<Vec<String>> = updates
        .iter()
        .map(|u| {
            vec![
                u.edge_id.clone(),
                u.state.to_string(),
                format!("{}%", u.progress),
                u.failure_reason.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render(&["EDGE", "STATE", "PROGRESS", "REASON"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_pads_columns() {
        let out = render(
            &["ID", "NAME"],
            &[vec!["e1".into(), "San Francisco".into()], vec!["edge-22".into(), "LA".into()]],
        );
        assert_eq!(out, "ID       NAME\ne1       San Francisco\nedge-22  LA");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&["ID"], &[]), "ID");
    }

    #[test]
    fn test_render_log_batches() {
        use sherlock_common::entities::LogBatchStatus;
        let batches = vec![LogBatch {
            batch_id: "batch-1".into(),
            name: "Log_1".into(),
            entry_count: 2,
            edge_ids: vec!["e1".into(), "e2".into()],
            created_at: None,
            status: Some(LogBatchStatus::PartialFailure),
        }];
        let out = render_log_batches(&batches);
        assert_eq!(out.lines().nth(1), Some("Log_1  batch-1           2      Partial Failure"));
    }
}
