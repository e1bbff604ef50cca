//! Database schema initialization and migrations.

use crate::error::{DatabaseResultExt, EngineError, Result};

impl super::Database {
    /// Initializes the database schema using the embedded SQL file.
    pub(super) fn initialize_schema(&self) -> Result<()> {
        // Enable foreign keys for this connection
        self.connection
            .execute("PRAGMA foreign_keys = ON", [])
            .db_context("Failed to enable foreign keys")?;

        // Execute the schema SQL
        let schema_sql = include_str!("../../assets/schema.sql");
        self.connection
            .execute_batch(schema_sql)
            .db_context("Failed to initialize database schema")?;

        // Apply migrations for existing databases
        self.apply_migrations()?;

        Ok(())
    }

    /// Apply database migrations for existing databases
    fn apply_migrations(&self) -> Result<()> {
        // Check if completed_at column exists in plan_steps table
        let has_completed_at: bool = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('plan_steps') WHERE name = 'completed_at'",
                [],
                |row| row.get(0),
            )
            .map(|count: i64| count > 0)
            .unwrap_or(false);

        if !has_completed_at {
            self.connection
                .execute("ALTER TABLE plan_steps ADD COLUMN completed_at TEXT", [])
                .map_err(|e| {
                    EngineError::database_error(
                        "Failed to add completed_at column to plan_steps table",
                        e,
                    )
                })?;
        }

        Ok(())
    }
}
