//! The canonical store crate (C6), plus the staging (C7) and merge (C8)
//! machinery that sits on top of it. A single `rusqlite` file, WAL-journaled,
//! is the unit of truth; every worker opens its own `Connection` against the
//! same path, and `MergeCoordinator` is the only thing allowed to promote
//! staged rows into the canonical tables.

pub mod merge;
pub mod schema;
pub mod staging;
pub mod store;

pub use merge::{MergeCoordinator, MergeResult};
pub use staging::StagingManager;
pub use store::Store;
