//! Selector-match engine.
//!
//! All functions are pure and total: malformed or missing input yields
//! `false` / `0`, never an error.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use sherlock_common::{CategoryInfo, DataSource, DataSourceFieldSelector};

// ── Grouping ──────────────────────────────────────────────────────────────────

/// Origin selectors grouped by category id: `category id -> accepted values`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorGroups<'a> {
    groups: BTreeMap<&'a str, HashSet<&'a str>>,
}

impl<'a> SelectorGroups<'a> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn category_ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.groups.keys().copied()
    }

    /// True if `selector` satisfies the group for its category.
    fn accepts(&self, category_id: &str, selector: &DataSourceFieldSelector) -> bool {
        selector.id == category_id
            && self
                .groups
                .get(category_id)
                .is_some_and(|values| values.contains(selector.value.as_str()))
    }

    fn iter(&self) -> impl Iterator<Item = (&'a str, &HashSet<&'a str>)> {
        self.groups.iter().map(|(k, v)| (*k, v))
    }
}

pub fn group_by_category(origin_selectors: &[CategoryInfo]) -> SelectorGroups<'_> {
    let mut groups: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for sel in origin_selectors {
        groups.entry(sel.id.as_str()).or_default().insert(sel.value.as_str());
    }
    SelectorGroups { groups }
}

// ── Data source matching ──────────────────────────────────────────────────────

/// Does `data_source` match every category group of `origin_selectors`?
///
/// An empty `origin_selectors` list matches vacuously. When `data_type` is
/// non-empty, at least one field of that type must also be in scope.
pub fn matches_origin_selectors(
    data_source: &DataSource,
    origin_selectors: &[CategoryInfo],
    data_type: &str,
) -> bool {
    let groups = group_by_category(origin_selectors);
    if groups.is_empty() {
        return true;
    }
    if !groups_match(&groups, &data_source.selectors) {
        return false;
    }
    data_type.is_empty() || !scoped_fields(data_source, &groups, data_type).is_empty()
}

fn groups_match(groups: &SelectorGroups<'_>, selectors: &[DataSourceFieldSelector]) -> bool {
    groups.iter().all(|(category_id, values)| {
        selectors
            .iter()
            .any(|s| s.id == category_id && values.contains(s.value.as_str()))
    })
}

/// Names of the fields selected by `origin_selectors`: the intersection,
/// across category groups, of the scopes of the matching selectors.
pub fn matching_fields(
    data_source: &DataSource,
    origin_selectors: &[CategoryInfo],
    data_type: &str,
) -> BTreeSet<String> {
    let groups = group_by_category(origin_selectors);
    if groups.is_empty() || !groups_match(&groups, &data_source.selectors) {
        return BTreeSet::new();
    }
    scoped_fields(data_source, &groups, data_type)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Number of fields of `data_source` selected by `origin_selectors`.
pub fn matching_field_count(
    data_source: &DataSource,
    origin_selectors: &[CategoryInfo],
    data_type: &str,
) -> usize {
    matching_fields(data_source, origin_selectors, data_type).len()
}

fn scoped_fields<'d>(
    data_source: &'d DataSource,
    groups: &SelectorGroups<'_>,
    data_type: &str,
) -> BTreeSet<&'d str> {
    let mut result: Option<BTreeSet<&'d str>> = None;

    for category_id in groups.category_ids() {
        let mut in_scope: BTreeSet<&'d str> = BTreeSet::new();
        for selector in data_source.selectors.iter().filter(|s| groups.accepts(category_id, s)) {
            if selector.is_all_scope() {
                in_scope.extend(data_source.field_names());
            } else {
                in_scope.extend(
                    data_source
                        .field_names()
                        .filter(|name| selector.scope.iter().any(|s| s == name)),
                );
            }
        }
        result = Some(match result {
            None => in_scope,
            Some(acc) => acc.intersection(&in_scope).copied().collect(),
        });
    }

    let mut fields = result.unwrap_or_default();
    if !data_type.is_empty() {
        fields.retain(|name| {
            data_source
                .fields
                .iter()
                .any(|f| f.name == *name && f.field_type == data_type)
        });
    }
    fields
}

// ── Label matching ────────────────────────────────────────────────────────────

/// Label rule used for edges: `labels` match `selectors` when every
/// selected category has at least one label with an accepted value.
/// Empty labels or empty selectors never match.
pub fn category_match(labels: &[CategoryInfo], selectors: &[CategoryInfo]) -> bool {
    if labels.is_empty() || selectors.is_empty() {
        return false;
    }
    let groups = group_by_category(selectors);
    let matched = groups.iter().all(|(category_id, values)| {
        labels
            .iter()
            .any(|l| l.id == category_id && values.contains(l.value.as_str()))
    });
    matched
}

/// Intersect two selector lists.
///
/// Entries of `a` survive when `b` does not constrain their category or
/// contains the exact pair; entries of `b` for categories absent from `a`
/// are appended.
pub fn category_and(a: &[CategoryInfo], b: &[CategoryInfo]) -> Vec<CategoryInfo> {
    if a.is_empty() {
        return b.to_vec();
    }
    let mut result = Vec::new();
    for cat in a {
        let id_match = b.iter().any(|c| c.id == cat.id);
        if !id_match || b.contains(cat) {
            result.push(cat.clone());
        }
    }
    for cat in b {
        if !a.iter().any(|c| c.id == cat.id) {
            result.push(cat.clone());
        }
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sherlock_common::DataSourceFieldSelector as Sel;
    use sherlock_test_utils::{airport_tenant, data_source, field, AIRPORT, LOCATION_TYPE};

    fn ci(id: &str, value: &str) -> CategoryInfo {
        CategoryInfo::new(id, value)
    }

    fn three_fields() -> Vec<sherlock_common::DataSourceFieldInfo> {
        vec![field("a", "Temperature"), field("b", "Temperature"), field("c", "Pressure")]
    }

    #[test]
    fn test_empty_origin_matches_anything() {
        let ds = data_source("ds", "e", three_fields(), vec![]);
        assert!(matches_origin_selectors(&ds, &[], ""));
        assert!(matches_origin_selectors(&DataSource::default(), &[], "Temperature"));
    }

    #[test]
    fn test_or_within_category() {
        let origin = [ci("1", "A"), ci("1", "B")];
        let hit = data_source("ds", "e", three_fields(), vec![Sel::all_fields("1", "A")]);
        let miss = data_source("ds", "e", three_fields(), vec![Sel::all_fields("1", "C")]);
        assert!(matches_origin_selectors(&hit, &origin, ""));
        assert!(!matches_origin_selectors(&miss, &origin, ""));
    }

    #[test]
    fn test_and_across_categories() {
        let origin = [ci("1", "A"), ci("2", "X")];
        let only_one = data_source("ds", "e", three_fields(), vec![Sel::all_fields("1", "A")]);
        let both = data_source(
            "ds",
            "e",
            three_fields(),
            vec![Sel::all_fields("1", "A"), Sel::all_fields("2", "X")],
        );
        assert!(!matches_origin_selectors(&only_one, &origin, ""));
        assert!(matches_origin_selectors(&both, &origin, ""));
    }

    #[test]
    fn test_missing_selectors_do_not_match() {
        let ds = DataSource::default();
        assert!(!matches_origin_selectors(&ds, &[ci("1", "A")], ""));
        assert_eq!(matching_field_count(&ds, &[ci("1", "A")], ""), 0);
    }

    #[test]
    fn test_all_scope_counts_every_field() {
        let ds = data_source("ds", "e", three_fields(), vec![Sel::all_fields("1", "A")]);
        assert_eq!(matching_field_count(&ds, &[ci("1", "A")], ""), 3);
    }

    #[test]
    fn test_explicit_scopes_intersect_across_groups() {
        let ds = data_source(
            "ds",
            "e",
            three_fields(),
            vec![Sel::scoped("1", "A", ["a", "b"]), Sel::scoped("2", "X", ["b", "c"])],
        );
        let origin = [ci("1", "A"), ci("2", "X")];
        assert_eq!(matching_fields(&ds, &origin, ""), BTreeSet::from(["b".to_string()]));
        assert_eq!(matching_field_count(&ds, &origin, ""), 1);
    }

    #[test]
    fn test_scopes_union_within_group() {
        let ds = data_source(
            "ds",
            "e",
            three_fields(),
            vec![Sel::scoped("1", "A", ["a"]), Sel::scoped("1", "B", ["c"])],
        );
        let origin = [ci("1", "A"), ci("1", "B")];
        assert_eq!(matching_field_count(&ds, &origin, ""), 2);
    }

    #[test]
    fn test_end_to_end_lax() {
        let ds = data_source(
            "ds",
            "e",
            vec![field("t1", "Temperature"), field("t2", "Temperature")],
            vec![Sel::all_fields("cat1", "LAX")],
        );
        let origin = [ci("cat1", "LAX")];
        assert!(matches_origin_selectors(&ds, &origin, ""));
        assert_eq!(matching_field_count(&ds, &origin, ""), 2);
    }

    #[test]
    fn test_empty_origin_counts_zero_fields() {
        let ds = data_source("ds", "e", three_fields(), vec![Sel::all_fields("1", "A")]);
        assert_eq!(matching_field_count(&ds, &[], ""), 0);
    }

    #[test]
    fn test_data_type_filters_fields() {
        let ds = data_source("ds", "e", three_fields(), vec![Sel::all_fields("1", "A")]);
        let origin = [ci("1", "A")];
        assert_eq!(matching_field_count(&ds, &origin, "Temperature"), 2);
        assert_eq!(matching_field_count(&ds, &origin, "Pressure"), 1);
        assert!(!matches_origin_selectors(&ds, &origin, "Image"));
    }

    #[test]
    fn test_data_type_must_be_in_scope() {
        let ds = data_source("ds", "e", three_fields(), vec![Sel::scoped("1", "A", ["a", "b"])]);
        assert!(!matches_origin_selectors(&ds, &[ci("1", "A")], "Pressure"));
        assert!(matches_origin_selectors(&ds, &[ci("1", "A")], "Temperature"));
    }

    #[test]
    fn test_scope_naming_unknown_field_is_ignored() {
        let ds = data_source("ds", "e", three_fields(), vec![Sel::scoped("1", "A", ["a", "ghost"])]);
        assert_eq!(matching_field_count(&ds, &[ci("1", "A")], ""), 1);
    }

    #[test]
    fn test_airport_terminal_cameras() {
        let (_, sources) = airport_tenant();
        let sfo_cams = sources.iter().find(|d| d.id == "sfo-cams").unwrap();
        let origin = [ci(AIRPORT, "SFO"), ci(LOCATION_TYPE, "Terminal")];
        assert_eq!(matching_field_count(sfo_cams, &origin, "Image"), 3);
        let parking = [ci(AIRPORT, "SFO"), ci(LOCATION_TYPE, "Parking Lot")];
        assert_eq!(matching_field_count(sfo_cams, &parking, ""), 1);
    }

    #[test]
    fn test_category_match_labels() {
        let labels = [ci("1", "A"), ci("2", "X")];
        assert!(category_match(&labels, &[ci("1", "A"), ci("1", "B")]));
        assert!(category_match(&labels, &[ci("1", "B"), ci("1", "A"), ci("2", "X")]));
        assert!(!category_match(&labels, &[ci("1", "A"), ci("3", "Z")]));
        assert!(!category_match(&[], &[ci("1", "A")]));
        assert!(!category_match(&labels, &[]));
    }

    #[test]
    fn test_category_and() {
        let a = [ci("1", "A"), ci("1", "B"), ci("2", "X")];
        let b = [ci("1", "A"), ci("3", "Z")];
        assert_eq!(category_and(&a, &b), vec![ci("1", "A"), ci("2", "X"), ci("3", "Z")]);
        assert_eq!(category_and(&[], &b), b.to_vec());
    }

    #[test]
    fn test_group_by_category() {
        let origin = [ci("1", "A"), ci("2", "X"), ci("1", "B"), ci("1", "A")];
        let groups = group_by_category(&origin);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.category_ids().collect::<Vec<_>>(), vec!["1", "2"]);
    }
}
