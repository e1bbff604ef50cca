//! Step row mapping and execution-state updates.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};

use super::utils::{parse_enum, parse_timestamp_opt};
use crate::error::{DatabaseResultExt, EngineError, Result};
use crate::models::{Focus, PlanStatus, PlanStep, SlotType, TimeSlot};

pub(super) const SELECT_STEPS_BY_DAY_SQL: &str = "SELECT id, day_id, plan_id, exercise_id, slot_type, time_slot, category, difficulty, order_in_day, is_completed, skipped, canceled_by_adaptation, scheduled_for, completed_at FROM plan_steps WHERE day_id = ?1 ORDER BY order_in_day";
const SELECT_STEP_SQL: &str = "SELECT id, day_id, plan_id, exercise_id, slot_type, time_slot, category, difficulty, order_in_day, is_completed, skipped, canceled_by_adaptation, scheduled_for, completed_at FROM plan_steps WHERE id = ?1";
const SELECT_PLAN_STATUS_FOR_STEP_SQL: &str =
    "SELECT p.status FROM plans p JOIN plan_steps s ON s.plan_id = p.id WHERE s.id = ?1";
const UPDATE_STEP_COMPLETED_SQL: &str = "UPDATE plan_steps SET is_completed = 1, completed_at = ?1, scheduled_for = NULL WHERE id = ?2";
const UPDATE_STEP_SKIPPED_SQL: &str =
    "UPDATE plan_steps SET skipped = 1, scheduled_for = NULL WHERE id = ?1";
pub(super) const INSERT_STEP_SQL: &str = "INSERT INTO plan_steps (day_id, plan_id, exercise_id, slot_type, time_slot, category, difficulty, order_in_day, is_completed, skipped, canceled_by_adaptation, scheduled_for, completed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";
pub(super) const UPDATE_STEP_ADAPTATION_SQL: &str = "UPDATE plan_steps SET exercise_id = ?1, difficulty = ?2, canceled_by_adaptation = ?3, scheduled_for = ?4 WHERE id = ?5";

/// Builds a [`PlanStep`] from a full step row.
pub(super) fn map_step_row(row: &rusqlite::Row) -> rusqlite::Result<PlanStep> {
    Ok(PlanStep {
        id: row.get::<_, i64>(0)? as u64,
        day_id: row.get::<_, i64>(1)? as u64,
        plan_id: row.get::<_, i64>(2)? as u64,
        exercise_id: row.get(3)?,
        slot_type: parse_enum::<SlotType>(4, row.get(4)?)?,
        time_slot: parse_enum::<TimeSlot>(5, row.get(5)?)?,
        category: parse_enum::<Focus>(6, row.get(6)?)?,
        difficulty: row.get::<_, i64>(7)? as u8,
        order_in_day: row.get::<_, i64>(8)? as u32,
        is_completed: row.get(9)?,
        skipped: row.get(10)?,
        canceled_by_adaptation: row.get(11)?,
        scheduled_for: parse_timestamp_opt(12, row.get(12)?)?,
        completed_at: parse_timestamp_opt(13, row.get(13)?)?,
    })
}

/// Loads a day's steps in order. Works inside any transaction.
pub(super) fn steps_for_day(conn: &Connection, day_id: u64) -> Result<Vec<PlanStep>> {
    let mut stmt = conn
        .prepare(SELECT_STEPS_BY_DAY_SQL)
        .db_context("Failed to prepare step query")?;
    let steps = stmt
        .query_map(params![day_id as i64], map_step_row)
        .db_context("Failed to query steps")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .db_context("Failed to fetch steps")?;
    Ok(steps)
}

/// Inserts a step row and returns the new id.
pub(super) fn insert_step(conn: &Connection, step: &PlanStep) -> Result<u64> {
    conn.execute(
        INSERT_STEP_SQL,
        params![
            step.day_id as i64,
            step.plan_id as i64,
            &step.exercise_id,
            step.slot_type.as_str(),
            step.time_slot.as_str(),
            step.category.as_str(),
            i64::from(step.difficulty),
            i64::from(step.order_in_day),
            step.is_completed,
            step.skipped,
            step.canceled_by_adaptation,
            step.scheduled_for.map(|t| t.to_string()),
            step.completed_at.map(|t| t.to_string()),
        ],
    )
    .db_context("Failed to insert step")?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Writes back the fields an adaptation may change on an existing step.
pub(super) fn update_step_after_adaptation(conn: &Connection, step: &PlanStep) -> Result<()> {
    conn.execute(
        UPDATE_STEP_ADAPTATION_SQL,
        params![
            &step.exercise_id,
            i64::from(step.difficulty),
            step.canceled_by_adaptation,
            step.scheduled_for.map(|t| t.to_string()),
            step.id as i64,
        ],
    )
    .db_context("Failed to update step")?;
    Ok(())
}

impl super::Database {
    /// Retrieves a step by id.
    pub fn get_step(&self, step_id: u64) -> Result<Option<PlanStep>> {
        self.connection
            .query_row(SELECT_STEP_SQL, params![step_id as i64], map_step_row)
            .optional()
            .db_context("Failed to query step")
    }

    /// Marks a step completed. Terminal steps and steps removed by an
    /// adaptation are rejected with a distinct reason.
    pub fn complete_step(&mut self, step_id: u64) -> Result<PlanStep> {
        self.finish_step(step_id, true)
    }

    /// Marks a step skipped (the other terminal state).
    pub fn skip_step(&mut self, step_id: u64) -> Result<PlanStep> {
        self.finish_step(step_id, false)
    }

    fn finish_step(&mut self, step_id: u64, completed: bool) -> Result<PlanStep> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let step = tx
            .query_row(SELECT_STEP_SQL, params![step_id as i64], map_step_row)
            .optional()
            .db_context("Failed to query step")?
            .ok_or(EngineError::StepNotFound { id: step_id })?;

        if step.is_completed {
            return Err(EngineError::not_eligible("step_already_completed"));
        }
        if step.skipped {
            return Err(EngineError::not_eligible("step_already_skipped"));
        }
        if step.canceled_by_adaptation {
            return Err(EngineError::not_eligible("step_canceled"));
        }

        let status: String = tx
            .query_row(
                SELECT_PLAN_STATUS_FOR_STEP_SQL,
                params![step_id as i64],
                |row| row.get(0),
            )
            .db_context("Failed to query plan status")?;
        if status.parse::<PlanStatus>() != Ok(PlanStatus::Active) {
            return Err(EngineError::not_eligible("plan_not_active"));
        }

        if completed {
            let now = Timestamp::now().to_string();
            tx.execute(UPDATE_STEP_COMPLETED_SQL, params![&now, step_id as i64])
                .db_context("Failed to complete step")?;
        } else {
            tx.execute(UPDATE_STEP_SKIPPED_SQL, params![step_id as i64])
                .db_context("Failed to skip step")?;
        }

        let updated = tx
            .query_row(SELECT_STEP_SQL, params![step_id as i64], map_step_row)
            .db_context("Failed to re-read step")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(updated)
    }
}
