//! Columnar value store: per-(model, field) typed columns and dirty
//! tracking.

pub mod column;
pub mod dirty;
pub mod store;

pub use column::ColumnStore;
pub use dirty::{DirtyEntry, DirtySet};
pub use store::Store;
