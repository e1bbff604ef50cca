//! Database operations and SQLite management for users, drafts, plans,
//! and the adaptation audit trail.
//!
//! Each query module covers one aggregate. Multi-row operations
//! (finalization, adaptation) run inside `IMMEDIATE` transactions —
//! SQLite's write-lock equivalent of select-for-update — so a second
//! finalize/adapt on the same plan cannot interleave with the
//! read-then-write sequence.

use std::path::Path;

use rusqlite::Connection;

use crate::error::{DatabaseResultExt, Result};

pub mod adaptations;
pub mod draft_queries;
pub mod migrations;
pub mod plan_queries;
pub mod step_queries;
pub mod user_queries;
pub mod utils;
pub mod version_queries;

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Creates a new database connection and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}
