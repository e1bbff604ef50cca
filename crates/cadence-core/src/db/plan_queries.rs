//! Plan CRUD, the finalization transaction, and plan-tree loading.

use jiff::Timestamp;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::step_queries::{insert_step, steps_for_day};
use super::user_queries::map_user_row;
use super::utils::{parse_enum, parse_json, parse_timestamp, parse_timestamp_opt};
use crate::error::{DatabaseResultExt, EngineError, Result};
use crate::fsm::SessionState;
use crate::models::{
    Draft, Duration, Focus, Load, Plan, PlanDay, PlanStatus, PlanStep, TimeSlot, User,
};
use crate::schedule::{self, ScheduleRequest, SlotTimes};

const SELECT_PLAN_SQL: &str = "SELECT id, user_id, status, duration, focus, load, total_days, adaptation_version, preferred_time_slots, start_date, end_date, created_at, updated_at FROM plans WHERE id = ?1";
const SELECT_ACTIVE_PLAN_SQL: &str = "SELECT id, user_id, status, duration, focus, load, total_days, adaptation_version, preferred_time_slots, start_date, end_date, created_at, updated_at FROM plans WHERE user_id = ?1 AND status = 'active' ORDER BY id DESC LIMIT 1";
const SELECT_CURRENT_PLAN_SQL: &str = "SELECT id, user_id, status, duration, focus, load, total_days, adaptation_version, preferred_time_slots, start_date, end_date, created_at, updated_at FROM plans WHERE user_id = ?1 AND status IN ('active', 'paused') ORDER BY id DESC LIMIT 1";
const SELECT_DAYS_SQL: &str =
    "SELECT id, plan_id, day_number FROM plan_days WHERE plan_id = ?1 ORDER BY day_number";
const INSERT_PLAN_SQL: &str = "INSERT INTO plans (user_id, status, duration, focus, load, total_days, adaptation_version, preferred_time_slots, start_date, end_date, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?10)";
const INSERT_DAY_SQL: &str = "INSERT INTO plan_days (plan_id, day_number) VALUES (?1, ?2)";
const UPDATE_PLAN_SQL: &str = "UPDATE plans SET status = ?1, duration = ?2, load = ?3, total_days = ?4, adaptation_version = ?5, preferred_time_slots = ?6, end_date = ?7, updated_at = ?8 WHERE id = ?9";
const DELETE_DRAFT_SQL: &str = "DELETE FROM drafts WHERE user_id = ?1";
const SELECT_DRAFT_PAYLOAD_SQL: &str = "SELECT payload FROM drafts WHERE user_id = ?1";
const UPDATE_USER_STATE_SQL: &str =
    "UPDATE users SET current_state = ?1, updated_at = ?2 WHERE id = ?3";
const SELECT_USER_SQL: &str = "SELECT id, timezone, current_state, slot_times, created_at, updated_at FROM users WHERE id = ?1";

fn map_plan_row(row: &rusqlite::Row) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: row.get::<_, i64>(0)? as u64,
        user_id: row.get::<_, i64>(1)? as u64,
        status: parse_enum::<PlanStatus>(2, row.get(2)?)?,
        duration: parse_enum::<Duration>(3, row.get(3)?)?,
        focus: parse_enum::<Focus>(4, row.get(4)?)?,
        load: parse_enum::<Load>(5, row.get(5)?)?,
        total_days: row.get::<_, i64>(6)? as u32,
        current_day: 1,
        adaptation_version: row.get::<_, i64>(7)? as u32,
        preferred_time_slots: parse_json::<Vec<TimeSlot>>(8, row.get(8)?)?,
        start_date: parse_timestamp(9, row.get(9)?)?,
        end_date: parse_timestamp_opt(10, row.get(10)?)?,
        created_at: parse_timestamp(11, row.get(11)?)?,
        updated_at: parse_timestamp(12, row.get(12)?)?,
        days: Vec::new(),
    })
}

/// Loads a plan with its days and steps, deriving `current_day` from
/// the start date in the user's timezone (clamped to the day range).
pub(super) fn load_plan_tree(conn: &Connection, plan_id: u64, now: Timestamp) -> Result<Option<Plan>> {
    let Some(mut plan) = conn
        .query_row(SELECT_PLAN_SQL, params![plan_id as i64], map_plan_row)
        .optional()
        .db_context("Failed to query plan")?
    else {
        return Ok(None);
    };

    let timezone: String = conn
        .query_row(
            "SELECT timezone FROM users WHERE id = ?1",
            params![plan.user_id as i64],
            |row| row.get(0),
        )
        .db_context("Failed to query plan owner timezone")?;
    let tz = schedule::resolve_timezone(&timezone);
    let anchor = schedule::anchor_from_start(plan.start_date, &tz);
    let today = now.to_zoned(tz).date();
    let elapsed = i64::from((today - anchor).get_days());
    plan.current_day = (elapsed + 1).clamp(1, i64::from(plan.total_days)) as u32;

    let mut stmt = conn
        .prepare(SELECT_DAYS_SQL)
        .db_context("Failed to prepare day query")?;
    let days: Vec<PlanDay> = stmt
        .query_map(params![plan_id as i64], |row| {
            Ok(PlanDay {
                id: row.get::<_, i64>(0)? as u64,
                plan_id: row.get::<_, i64>(1)? as u64,
                day_number: row.get::<_, i64>(2)? as u32,
                steps: Vec::new(),
            })
        })
        .db_context("Failed to query days")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .db_context("Failed to fetch days")?;

    plan.days = days;
    for day in &mut plan.days {
        day.steps = steps_for_day(conn, day.id)?;
    }

    Ok(Some(plan))
}

/// Writes back the plan-row fields adaptations may change.
pub(super) fn update_plan_row(conn: &Connection, plan: &Plan) -> Result<()> {
    let slots = serde_json::to_string(&plan.preferred_time_slots)?;
    conn.execute(
        UPDATE_PLAN_SQL,
        params![
            plan.status.as_str(),
            plan.duration.as_str(),
            plan.load.as_str(),
            plan.total_days,
            plan.adaptation_version,
            &slots,
            plan.end_date.map(|t| t.to_string()),
            Timestamp::now().to_string(),
            plan.id as i64,
        ],
    )
    .db_context("Failed to update plan")?;
    Ok(())
}

/// Inserts a full plan tree from a draft and schedules every step.
/// Returns the new plan id and the schedule requests for the caller to
/// hand to the delivery scheduler after commit.
pub(super) fn insert_plan_from_draft(
    conn: &Connection,
    user: &User,
    draft: &Draft,
    activation: Timestamp,
    slot_times: &SlotTimes,
) -> Result<(u64, Vec<ScheduleRequest>)> {
    let tz = schedule::resolve_timezone(&user.timezone);
    let anchor = schedule::resolve_activation_anchor(
        &draft.day_one_slots(),
        activation,
        &tz,
        slot_times,
    )?;
    let start_date = schedule::anchor_start_instant(anchor, &tz)?;
    let end_date = start_date
        .to_zoned(tz.clone())
        .checked_add(jiff::Span::new().days(i64::from(draft.total_days)))
        .map(|z| z.timestamp())
        .map_err(|e| EngineError::Timezone {
            message: format!("failed to derive end date: {e}"),
        })?;

    let now = Timestamp::now().to_string();
    let slots = serde_json::to_string(&draft_preferred_slots(draft))?;
    conn.execute(
        INSERT_PLAN_SQL,
        params![
            user.id as i64,
            PlanStatus::Active.as_str(),
            draft.duration.as_str(),
            draft.focus.as_str(),
            draft.load.as_str(),
            draft.total_days,
            &slots,
            start_date.to_string(),
            end_date.to_string(),
            &now,
        ],
    )
    .db_context("Failed to insert plan")?;
    let plan_id = conn.last_insert_rowid() as u64;

    let mut requests = Vec::with_capacity(draft.steps.len());
    for day_number in 1..=draft.total_days {
        conn.execute(INSERT_DAY_SQL, params![plan_id as i64, day_number])
            .db_context("Failed to insert plan day")?;
        let day_id = conn.last_insert_rowid() as u64;

        let day_steps = draft.steps.iter().filter(|s| s.day_number == day_number);
        for (order, draft_step) in day_steps.enumerate() {
            let scheduled_for = schedule::compute_scheduled_for(
                anchor,
                day_number,
                draft_step.time_slot,
                &tz,
                slot_times,
            )?;
            let step = PlanStep {
                id: 0,
                day_id,
                plan_id,
                exercise_id: draft_step.exercise_id.clone(),
                slot_type: draft_step.slot_type,
                time_slot: draft_step.time_slot,
                category: draft_step.category,
                difficulty: draft_step.difficulty,
                order_in_day: order as u32,
                is_completed: false,
                skipped: false,
                canceled_by_adaptation: false,
                scheduled_for: Some(scheduled_for),
                completed_at: None,
            };
            let step_id = insert_step(conn, &step)?;
            requests.push(ScheduleRequest {
                step_id,
                scheduled_for,
                timezone: user.timezone.clone(),
            });
        }
    }

    Ok((plan_id, requests))
}

/// The distinct time slots a draft actually uses, in delivery order.
fn draft_preferred_slots(draft: &Draft) -> Vec<TimeSlot> {
    let mut slots: Vec<TimeSlot> = Vec::new();
    for step in &draft.steps {
        if !slots.contains(&step.time_slot) {
            slots.push(step.time_slot);
        }
    }
    slots.sort();
    slots
}

impl super::Database {
    /// Retrieves a plan with days and steps.
    pub fn get_plan(&self, plan_id: u64) -> Result<Option<Plan>> {
        load_plan_tree(&self.connection, plan_id, Timestamp::now())
    }

    /// The user's active plan, if any.
    pub fn get_active_plan(&self, user_id: u64) -> Result<Option<Plan>> {
        let id: Option<i64> = self
            .connection
            .query_row(SELECT_ACTIVE_PLAN_SQL, params![user_id as i64], |row| {
                row.get(0)
            })
            .optional()
            .db_context("Failed to query active plan")?;
        match id {
            Some(id) => load_plan_tree(&self.connection, id as u64, Timestamp::now()),
            None => Ok(None),
        }
    }

    /// The user's most recent live plan: active, falling back to paused.
    pub fn get_current_plan(&self, user_id: u64) -> Result<Option<Plan>> {
        let id: Option<i64> = self
            .connection
            .query_row(SELECT_CURRENT_PLAN_SQL, params![user_id as i64], |row| {
                row.get(0)
            })
            .optional()
            .db_context("Failed to query current plan")?;
        match id {
            Some(id) => load_plan_tree(&self.connection, id as u64, Timestamp::now()),
            None => Ok(None),
        }
    }

    /// Finalizes the user's pending draft into a live plan.
    ///
    /// Runs as one IMMEDIATE transaction covering the one-active-plan
    /// check, the plan/day/step inserts, draft consumption, and the
    /// user's FSM move to ACTIVE. Returns the new plan and the schedule
    /// requests the caller must dispatch after commit.
    pub fn finalize_draft(
        &mut self,
        user_id: u64,
        activation: Timestamp,
    ) -> Result<(Plan, Vec<ScheduleRequest>)> {
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin immediate transaction")?;

        let user = tx
            .query_row(SELECT_USER_SQL, params![user_id as i64], map_user_row)
            .optional()
            .db_context("Failed to query user")?
            .ok_or(EngineError::UserNotFound { id: user_id })?;

        let draft: Draft = tx
            .query_row(SELECT_DRAFT_PAYLOAD_SQL, params![user_id as i64], |row| {
                parse_json(0, row.get(0)?)
            })
            .optional()
            .db_context("Failed to query draft")?
            .ok_or(EngineError::DraftNotFound { user_id })?;

        if !draft.is_valid() {
            return Err(EngineError::DraftInvalid {
                id: draft.id,
                errors: draft.validation_errors,
            });
        }

        let active: Option<i64> = tx
            .query_row(SELECT_ACTIVE_PLAN_SQL, params![user_id as i64], |row| {
                row.get(0)
            })
            .optional()
            .db_context("Failed to check for active plan")?;
        if let Some(plan_id) = active {
            return Err(EngineError::ActivePlanExists {
                user_id,
                plan_id: plan_id as u64,
            });
        }

        let slot_times = user.effective_slot_times();
        let (plan_id, requests) =
            insert_plan_from_draft(&tx, &user, &draft, activation, &slot_times)?;

        tx.execute(DELETE_DRAFT_SQL, params![user_id as i64])
            .db_context("Failed to consume draft")?;
        tx.execute(
            UPDATE_USER_STATE_SQL,
            params![
                SessionState::Active.as_str(),
                Timestamp::now().to_string(),
                user_id as i64
            ],
        )
        .db_context("Failed to update user state")?;

        let plan = load_plan_tree(&tx, plan_id, activation)?.ok_or(EngineError::Integrity {
            message: format!("plan {plan_id} vanished inside finalize transaction"),
        })?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok((plan, requests))
    }
}
