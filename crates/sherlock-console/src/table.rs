//! List-view table state: row selection with a tri-state header checkbox,
//! column sorting and the per-row action menu.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sherlock_common::entities::{Application, Category, DataSource, DataStream, Edge, Project, User};
use sherlock_common::SherlockError;

/// A value a row exposes for sorting.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    Number(f64),
    Flag(bool),
    Time(DateTime<Utc>),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Flag(_) => 0,
            SortValue::Number(_) => 1,
            SortValue::Time(_) => 2,
            SortValue::Text(_) => 3,
        }
    }

    /// Total order. Values of different kinds order by kind.
    pub fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Flag(a), SortValue::Flag(b)) => a.cmp(b),
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for SortValue {
    fn from(s: &str) -> Self {
        SortValue::Text(s.to_string())
    }
}

impl From<usize> for SortValue {
    fn from(n: usize) -> Self {
        SortValue::Number(n as f64)
    }
}

impl From<bool> for SortValue {
    fn from(b: bool) -> Self {
        SortValue::Flag(b)
    }
}

/// Something a list view can display.
pub trait Row {
    fn id(&self) -> &str;

    /// Value of `field` for sorting, `None` when the row has no such field.
    fn sort_key(&self, field: &str) -> Option<SortValue>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascend,
    Descend,
}

impl FromStr for SortOrder {
    type Err = SherlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascend" | "asc" => Ok(SortOrder::Ascend),
            "descend" | "desc" => Ok(SortOrder::Descend),
            other => Err(SherlockError::Validation(format!("unknown sort order '{other}'"))),
        }
    }
}

/// Entries of the per-row action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit,
    View,
    Remove,
    Clone,
}

impl RowAction {
    pub const ALL: [RowAction; 4] = [RowAction::Edit, RowAction::View, RowAction::Remove, RowAction::Clone];

    pub fn label(&self) -> &'static str {
        match self {
            RowAction::Edit => "Edit",
            RowAction::View => "View",
            RowAction::Remove => "Remove",
            RowAction::Clone => "Clone",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableState<R: Row> {
    rows: Vec<R>,
    checked: HashSet<String>,
    all_checked: bool,
    indeterminate: bool,
    /// Column name → row field used for sorting.
    columns: HashMap<String, String>,
    sort_map: BTreeMap<String, Option<SortOrder>>,
}

impl<R: Row> Default for TableState<R> {
    fn default() -> Self {
        Self::new(std::iter::empty::<(&str, &str)>())
    }
}

impl<R: Row> TableState<R> {
    pub fn new<I, C, F>(columns: I) -> Self
    where
        I: IntoIterator<Item = (C, F)>,
        C: Into<String>,
        F: Into<String>,
    {
        let columns: HashMap<String, String> =
            columns.into_iter().map(|(c, f)| (c.into(), f.into())).collect();
        let sort_map = columns.keys().map(|c| (c.clone(), None)).collect();
        Self {
            rows: Vec::new(),
            checked: HashSet::new(),
            all_checked: true,
            indeterminate: false,
            columns,
            sort_map,
        }
    }

    /// Replace the displayed rows. Rows keep their checked state when a row
    /// with the same id was checked before; the active sort is re-applied.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        let ids: HashSet<&str> = rows.iter().map(|r| r.id()).collect();
        self.checked.retain(|id| ids.contains(id.as_str()));
        self.rows = rows;
        if let Some((column, order)) = self.active_sort() {
            self.apply_sort(&column, order);
        }
        self.refresh_status();
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.checked.contains(id)
    }

    pub fn all_checked(&self) -> bool {
        self.all_checked
    }

    pub fn indeterminate(&self) -> bool {
        self.indeterminate
    }

    pub fn check_all(&mut self, value: bool) {
        if value {
            self.checked = self.rows.iter().map(|r| r.id().to_string()).collect();
        } else {
            self.checked.clear();
        }
        self.refresh_status();
    }

    /// Returns false when no displayed row has `id`.
    pub fn set_checked(&mut self, id: &str, value: bool) -> bool {
        if !self.rows.iter().any(|r| r.id() == id) {
            return false;
        }
        if value {
            self.checked.insert(id.to_string());
        } else {
            self.checked.remove(id);
        }
        self.refresh_status();
        true
    }

    /// Checked ids in display order.
    pub fn checked_ids(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|r| r.id())
            .filter(|id| self.checked.contains(*id))
            .collect()
    }

    pub fn checked_rows(&self) -> impl Iterator<Item = &R> {
        self.rows.iter().filter(|r| self.checked.contains(r.id()))
    }

    /// True when exactly one row is checked; single-row actions such as
    /// Update are only offered then.
    pub fn is_single_selection(&self) -> bool {
        self.checked.len() == 1
    }

    pub fn sort_indicator(&self, column: &str) -> Option<SortOrder> {
        self.sort_map.get(column).copied().flatten()
    }

    /// Sort by `column`. Other columns lose their indicator. Unknown columns
    /// leave the rows untouched and return false.
    pub fn sort(&mut self, column: &str, order: SortOrder) -> bool {
        if !self.columns.contains_key(column) {
            return false;
        }
        for (name, indicator) in self.sort_map.iter_mut() {
            *indicator = if name == column { Some(order) } else { None };
        }
        self.apply_sort(column, order);
        true
    }

    fn active_sort(&self) -> Option<(String, SortOrder)> {
        self.sort_map
            .iter()
            .find_map(|(c, o)| o.map(|order| (c.clone(), order)))
    }

    fn apply_sort(&mut self, column: &str, order: SortOrder) {
        let Some(field) = self.columns.get(column) else {
            return;
        };
        // `sort_by` is stable; reversing the comparator keeps ties in place.
        self.rows.sort_by(|a, b| {
            let ord = compare_keys(a.sort_key(field), b.sort_key(field));
            match order {
                SortOrder::Ascend => ord,
                SortOrder::Descend => ord.reverse(),
            }
        });
    }

    fn refresh_status(&mut self) {
        let all = self.rows.iter().all(|r| self.checked.contains(r.id()));
        let none = self.rows.iter().all(|r| !self.checked.contains(r.id()));
        self.all_checked = all;
        self.indeterminate = !all && !none;
    }
}

fn compare_keys(a: Option<SortValue>, b: Option<SortValue>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.compare(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── Row implementations for backend entities ─────────────────────────────────

impl Row for Edge {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "serialNumber" => Some(self.serial_number.as_str().into()),
            "ipAddress" => Some(self.ip_address.as_str().into()),
            "connected" => Some(self.connected.into()),
            _ => None,
        }
    }
}

impl Row for DataSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "edgeId" => Some(self.edge_id.as_str().into()),
            "type" => Some(self.kind.as_str().into()),
            "protocol" => Some(self.protocol.as_str().into()),
            "fields" => Some(self.fields.len().into()),
            "updatedAt" => self.updated_at.map(SortValue::Time),
            _ => None,
        }
    }
}

impl Row for DataStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "dataType" => Some(self.data_type.as_str().into()),
            "origin" => Some(self.origin.as_str().into()),
            "destination" => Some(self.destination.as_str().into()),
            _ => None,
        }
    }
}

impl Row for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "users" => Some(self.users.len().into()),
            "edgeSelectorType" => Some(format!("{:?}", self.edge_selector_type).as_str().into()),
            _ => None,
        }
    }
}

impl Row for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "purpose" => Some(self.purpose.as_str().into()),
            "values" => Some(self.values.len().into()),
            _ => None,
        }
    }
}

impl Row for Application {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "edges" => Some(self.edge_ids.len().into()),
            _ => None,
        }
    }
}

impl Row for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(self.id.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            "role" => Some(self.role.as_str().into()),
            _ => None,
        }
    }
}
