//! User CRUD operations and queries.

use std::collections::BTreeMap;

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension};

use super::utils::{parse_enum, parse_json, parse_timestamp};
use crate::error::{DatabaseResultExt, EngineError, Result};
use crate::fsm::SessionState;
use crate::models::User;

const INSERT_USER_SQL: &str = "INSERT INTO users (id, timezone, current_state, slot_times, created_at, updated_at) VALUES (?1, ?2, ?3, NULL, ?4, ?4) ON CONFLICT(id) DO NOTHING";
const SELECT_USER_SQL: &str = "SELECT id, timezone, current_state, slot_times, created_at, updated_at FROM users WHERE id = ?1";
const UPDATE_USER_STATE_SQL: &str =
    "UPDATE users SET current_state = ?1, updated_at = ?2 WHERE id = ?3";
const UPDATE_USER_TIMEZONE_SQL: &str =
    "UPDATE users SET timezone = ?1, updated_at = ?2 WHERE id = ?3";
const UPDATE_USER_SLOT_TIMES_SQL: &str =
    "UPDATE users SET slot_times = ?1, updated_at = ?2 WHERE id = ?3";

pub(super) fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let slot_times: Option<String> = row.get(3)?;
    Ok(User {
        id: row.get::<_, i64>(0)? as u64,
        timezone: row.get(1)?,
        current_state: parse_enum::<SessionState>(2, row.get(2)?)?,
        slot_times: slot_times
            .map(|raw| parse_json::<BTreeMap<String, String>>(3, raw))
            .transpose()?,
        created_at: parse_timestamp(4, row.get(4)?)?,
        updated_at: parse_timestamp(5, row.get(5)?)?,
    })
}

impl super::Database {
    /// Creates the user row if it does not exist yet and returns it.
    pub fn ensure_user(&mut self, user_id: u64, timezone: &str) -> Result<User> {
        let now = Timestamp::now().to_string();
        self.connection
            .execute(
                INSERT_USER_SQL,
                params![
                    user_id as i64,
                    timezone,
                    SessionState::IdleNew.as_str(),
                    &now
                ],
            )
            .db_context("Failed to insert user")?;

        self.get_user(user_id)?
            .ok_or(EngineError::UserNotFound { id: user_id })
    }

    /// Retrieves a user by id.
    pub fn get_user(&self, user_id: u64) -> Result<Option<User>> {
        self.connection
            .query_row(SELECT_USER_SQL, params![user_id as i64], map_user_row)
            .optional()
            .db_context("Failed to query user")
    }

    /// Persists a new session state for the user. The caller must have
    /// validated the transition through the FSM gate.
    pub fn update_user_state(&mut self, user_id: u64, state: SessionState) -> Result<()> {
        let now = Timestamp::now().to_string();
        let rows = self
            .connection
            .execute(
                UPDATE_USER_STATE_SQL,
                params![state.as_str(), &now, user_id as i64],
            )
            .db_context("Failed to update user state")?;
        if rows == 0 {
            return Err(EngineError::UserNotFound { id: user_id });
        }
        Ok(())
    }

    /// Updates the user's IANA timezone string.
    pub fn update_user_timezone(&mut self, user_id: u64, timezone: &str) -> Result<()> {
        let now = Timestamp::now().to_string();
        let rows = self
            .connection
            .execute(
                UPDATE_USER_TIMEZONE_SQL,
                params![timezone, &now, user_id as i64],
            )
            .db_context("Failed to update user timezone")?;
        if rows == 0 {
            return Err(EngineError::UserNotFound { id: user_id });
        }
        Ok(())
    }

    /// Stores the user's full slot-time override map and recomputes
    /// `scheduled_for` for every future step of their active plans from
    /// the new wall-clock times. Paused plans stay unscheduled; resume
    /// picks up the new times when it recomputes.
    ///
    /// Returns the deliveries to re-arrange post-commit.
    pub fn update_user_time_slots(
        &mut self,
        user_id: u64,
        slot_times: &BTreeMap<String, String>,
        now: Timestamp,
    ) -> Result<Vec<crate::schedule::ScheduleRequest>> {
        use rusqlite::TransactionBehavior;

        use crate::schedule::{self, ScheduleRequest, SlotTimes};

        let parsed = SlotTimes::from_strings(slot_times)?;
        let raw = serde_json::to_string(slot_times)?;

        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin immediate transaction")?;

        let user = tx
            .query_row(SELECT_USER_SQL, params![user_id as i64], map_user_row)
            .optional()
            .db_context("Failed to query user")?
            .ok_or(EngineError::UserNotFound { id: user_id })?;
        let tz = schedule::resolve_timezone(&user.timezone);

        tx.execute(
            UPDATE_USER_SLOT_TIMES_SQL,
            params![&raw, Timestamp::now().to_string(), user_id as i64],
        )
        .db_context("Failed to update user slot times")?;

        let plan_ids: Vec<i64> = {
            let mut stmt = tx
                .prepare("SELECT id FROM plans WHERE user_id = ?1 AND status = 'active'")
                .db_context("Failed to prepare plan query")?;
            let ids = stmt
                .query_map(params![user_id as i64], |row| row.get(0))
                .db_context("Failed to query active plans")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .db_context("Failed to fetch active plans")?;
            ids
        };

        let mut requests: Vec<ScheduleRequest> = Vec::new();
        for plan_id in plan_ids {
            let Some(mut plan) = super::plan_queries::load_plan_tree(&tx, plan_id as u64, now)?
            else {
                continue;
            };
            let anchor = schedule::anchor_from_start(plan.start_date, &tz);
            for (day_number, step) in plan.future_steps_mut(now) {
                step.scheduled_for = Some(schedule::compute_scheduled_for(
                    anchor,
                    day_number,
                    step.time_slot,
                    &tz,
                    &parsed,
                )?);
                tx.execute(
                    "UPDATE plan_steps SET scheduled_for = ?1 WHERE id = ?2",
                    params![step.scheduled_for.map(|t| t.to_string()), step.id as i64],
                )
                .db_context("Failed to reschedule step")?;
                requests.push(ScheduleRequest {
                    step_id: step.id,
                    scheduled_for: step.scheduled_for.unwrap_or(now),
                    timezone: user.timezone.clone(),
                });
            }
        }

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(requests)
    }
}
