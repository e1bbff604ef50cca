//! High-level engine API for composing, activating, and adapting plans.
//!
//! The [`Engine`] is the central coordinator between interface layers
//! and the database, mirroring the flow the rest of the crate defines:
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │  Interfaces  │───▶│      Engine      │───▶│   Database   │
//! │ (CLI, ...)   │    │ (async facade)   │    │  (via db/)   │
//! └──────────────┘    └──────────────────┘    └──────────────┘
//! ```
//!
//! All operations are async wrappers that run the blocking database work
//! on `tokio::task::spawn_blocking`. Operations that must arrange or
//! retract external deliveries return the affected step ids / schedule
//! requests so the caller can sequence those effects after the
//! transaction has committed.

use std::path::PathBuf;

pub mod adapt_ops;
pub mod builder;
pub mod draft_ops;
pub mod plan_ops;
pub mod user_ops;

pub use builder::EngineBuilder;

use crate::catalog::Catalog;

/// Main engine interface for managing drafts, plans, and adaptations.
pub struct Engine {
    pub(crate) db_path: PathBuf,
    pub(crate) catalog: Catalog,
}

impl Engine {
    /// Creates a new engine with the given database path and catalog.
    pub(crate) fn new(db_path: PathBuf, catalog: Catalog) -> Self {
        Self { db_path, catalog }
    }

    /// The content catalog this engine composes from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
