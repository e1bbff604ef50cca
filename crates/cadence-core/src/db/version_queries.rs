//! Append-only version log and adaptation history queries.

use jiff::Timestamp;
use rusqlite::{params, Connection};

use super::utils::{parse_enum, parse_json, parse_timestamp};
use crate::adaptation::{AdaptationCategory, AdaptationIntent};
use crate::error::{DatabaseResultExt, Result};
use crate::models::{AdaptationRecord, PlanVersion};

const INSERT_VERSION_SQL: &str =
    "INSERT INTO plan_versions (plan_id, adaptation_type, diff, created_at) VALUES (?1, ?2, ?3, ?4)";
const SELECT_VERSIONS_SQL: &str = "SELECT id, plan_id, adaptation_type, diff, created_at FROM plan_versions WHERE plan_id = ?1 ORDER BY id";
const INSERT_HISTORY_SQL: &str = "INSERT INTO adaptation_history (plan_id, intent, category, applied_at, is_rolled_back) VALUES (?1, ?2, ?3, ?4, 0)";
const SELECT_HISTORY_SQL: &str = "SELECT id, plan_id, intent, category, applied_at, is_rolled_back FROM adaptation_history WHERE plan_id = ?1 ORDER BY id";

/// Appends one version row. Never updated or deleted afterwards.
pub(super) fn insert_version(
    conn: &Connection,
    plan_id: u64,
    intent: AdaptationIntent,
    diff: &serde_json::Value,
    created_at: Timestamp,
) -> Result<u64> {
    conn.execute(
        INSERT_VERSION_SQL,
        params![
            plan_id as i64,
            intent.as_str(),
            serde_json::to_string(diff)?,
            created_at.to_string(),
        ],
    )
    .db_context("Failed to insert plan version")?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Appends one adaptation history entry.
pub(super) fn insert_history(
    conn: &Connection,
    plan_id: u64,
    intent: AdaptationIntent,
    applied_at: Timestamp,
) -> Result<u64> {
    conn.execute(
        INSERT_HISTORY_SQL,
        params![
            plan_id as i64,
            intent.as_str(),
            intent.category().as_str(),
            applied_at.to_string(),
        ],
    )
    .db_context("Failed to insert adaptation history")?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Loads the full adaptation history for a plan, oldest first.
pub(super) fn history_for_plan(conn: &Connection, plan_id: u64) -> Result<Vec<AdaptationRecord>> {
    let mut stmt = conn
        .prepare(SELECT_HISTORY_SQL)
        .db_context("Failed to prepare history query")?;
    let records = stmt
        .query_map(params![plan_id as i64], |row| {
            Ok(AdaptationRecord {
                id: row.get::<_, i64>(0)? as u64,
                plan_id: row.get::<_, i64>(1)? as u64,
                intent: parse_enum::<AdaptationIntent>(2, row.get(2)?)?,
                category: parse_enum::<AdaptationCategory>(3, row.get(3)?)?,
                applied_at: parse_timestamp(4, row.get(4)?)?,
                is_rolled_back: row.get(5)?,
            })
        })
        .db_context("Failed to query history")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .db_context("Failed to fetch history")?;
    Ok(records)
}

impl super::Database {
    /// The append-only version log for a plan, oldest first.
    pub fn list_versions(&self, plan_id: u64) -> Result<Vec<PlanVersion>> {
        let mut stmt = self
            .connection
            .prepare(SELECT_VERSIONS_SQL)
            .db_context("Failed to prepare version query")?;
        let versions = stmt
            .query_map(params![plan_id as i64], |row| {
                Ok(PlanVersion {
                    id: row.get::<_, i64>(0)? as u64,
                    plan_id: row.get::<_, i64>(1)? as u64,
                    adaptation_type: parse_enum::<AdaptationIntent>(2, row.get(2)?)?,
                    diff: parse_json(3, row.get(3)?)?,
                    created_at: parse_timestamp(4, row.get(4)?)?,
                })
            })
            .db_context("Failed to query versions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .db_context("Failed to fetch versions")?;
        Ok(versions)
    }

    /// The adaptation history for a plan, oldest first.
    pub fn list_history(&self, plan_id: u64) -> Result<Vec<AdaptationRecord>> {
        history_for_plan(&self.connection, plan_id)
    }
}
