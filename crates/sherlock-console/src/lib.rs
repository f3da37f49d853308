//! sherlock-console: UI-independent list-view machinery.
//!
//! Table selection and sorting, refresh timers that stop when their view
//! goes away, and a registry for passing entities between views.

pub mod list_view;
pub mod registry;
pub mod table;
pub mod timer;

pub use list_view::{Fetcher, ListView, NavigationEnd, DEFAULT_REFRESH_INTERVAL};
pub use registry::Registry;
pub use table::{Row, RowAction, SortOrder, SortValue, TableState};
pub use timer::{poll_until, ScopedTimer};
