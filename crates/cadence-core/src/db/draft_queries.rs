//! Draft persistence: one pending draft per user, replaced outright on
//! every new composition.

use rusqlite::{params, OptionalExtension};

use super::utils::parse_json;
use crate::error::{DatabaseResultExt, Result};
use crate::models::Draft;

const DELETE_DRAFT_SQL: &str = "DELETE FROM drafts WHERE user_id = ?1";
const INSERT_DRAFT_SQL: &str = "INSERT INTO drafts (id, user_id, duration, focus, load, total_days, is_valid, payload, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";
const SELECT_DRAFT_SQL: &str = "SELECT payload FROM drafts WHERE user_id = ?1";

impl super::Database {
    /// Stores a draft as the user's single pending draft. Any previous
    /// draft is deleted in the same transaction.
    pub fn replace_draft(&mut self, user_id: u64, draft: &Draft) -> Result<()> {
        let payload = serde_json::to_string(draft)?;

        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        tx.execute(DELETE_DRAFT_SQL, params![user_id as i64])
            .db_context("Failed to delete previous draft")?;

        tx.execute(
            INSERT_DRAFT_SQL,
            params![
                &draft.id,
                user_id as i64,
                draft.duration.as_str(),
                draft.focus.as_str(),
                draft.load.as_str(),
                draft.total_days,
                draft.is_valid(),
                &payload,
                draft.created_at.to_string(),
            ],
        )
        .db_context("Failed to insert draft")?;

        tx.commit().db_context("Failed to commit transaction")
    }

    /// Retrieves the user's pending draft, if any.
    pub fn get_draft(&self, user_id: u64) -> Result<Option<Draft>> {
        self.connection
            .query_row(SELECT_DRAFT_SQL, params![user_id as i64], |row| {
                parse_json::<Draft>(0, row.get(0)?)
            })
            .optional()
            .db_context("Failed to query draft")
    }

    /// Removes the user's pending draft.
    pub fn delete_draft(&mut self, user_id: u64) -> Result<()> {
        self.connection
            .execute(DELETE_DRAFT_SQL, params![user_id as i64])
            .db_context("Failed to delete draft")?;
        Ok(())
    }
}
