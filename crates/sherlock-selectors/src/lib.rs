//! sherlock-selectors: category/selector matching.
//!
//! Selectors with the same category id are combined with OR, selectors
//! with different category ids are combined with AND. This is the rule the
//! console uses to decide which data sources feed a data stream and which
//! edges belong to a category-scoped project.

pub mod matching;
pub mod affected;

pub use affected::{affected_edges, project_edge_count, AffectedEdges, EdgeImpact};
pub use matching::{
    category_and, category_match, group_by_category, matches_origin_selectors,
    matching_field_count, matching_fields, SelectorGroups,
};
