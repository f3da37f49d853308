//! sherlock-common: Shared types and errors used across all Sherlock crates.

pub mod error;
pub mod entities;

// Re-export commonly used types
pub use entities::{
    Category, CategoryInfo, DataSource, DataSourceFieldInfo, DataSourceFieldSelector,
    DataStream, Edge, EdgeSelectorType, Project, SCOPE_ALL,
};
pub use error::{Result, SherlockError};
