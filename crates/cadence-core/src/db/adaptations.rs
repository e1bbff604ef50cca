//! The adaptation transaction: policy check, in-memory mutation, and
//! persistence of the resulting diffs, all under one IMMEDIATE
//! transaction so no second adapt/finalize can interleave.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::plan_queries::{insert_plan_from_draft, load_plan_tree, update_plan_row};
use super::step_queries::{insert_step, update_step_after_adaptation};
use super::user_queries::map_user_row;
use super::version_queries::{history_for_plan, insert_history, insert_version};
use crate::adaptation::{engine, policy, AdaptationOutcome, AdaptationRequest, DifficultyShift};
use crate::catalog::Catalog;
use crate::error::{DatabaseResultExt, EngineError, Result};
use crate::fsm::SessionState;
use crate::models::{Plan, PlanStatus};
use crate::schedule::{self, ScheduleRequest};

const SELECT_USER_SQL: &str = "SELECT id, timezone, current_state, slot_times, created_at, updated_at FROM users WHERE id = ?1";
const SELECT_CURRENT_PLAN_ID_SQL: &str = "SELECT id FROM plans WHERE user_id = ?1 AND status IN ('active', 'paused') ORDER BY id DESC LIMIT 1";
const UPDATE_USER_STATE_SQL: &str =
    "UPDATE users SET current_state = ?1, updated_at = ?2 WHERE id = ?3";

/// Everything a caller needs after an applied adaptation: the updated
/// plan, the outcome (with its post-commit job lists), the deliveries to
/// arrange, and the replacement plan when a focus change spawned one.
#[derive(Debug, Clone)]
pub struct AppliedAdaptation {
    pub plan: Plan,
    pub outcome: AdaptationOutcome,
    pub schedule_requests: Vec<ScheduleRequest>,
    pub new_plan: Option<Plan>,
}

impl super::Database {
    /// Applies one adaptation to the user's current plan.
    ///
    /// Order inside the transaction: load plan + history, run the
    /// eligibility policy, run the engine mutation, persist step and
    /// plan changes, bump `adaptation_version`, append exactly one
    /// version row and one history row. Side effects on the delivery
    /// scheduler are returned as data, never invoked here.
    pub fn apply_adaptation(
        &mut self,
        user_id: u64,
        request: &AdaptationRequest,
        catalog: &Catalog,
        now: Timestamp,
    ) -> Result<AppliedAdaptation> {
        let intent = request.intent();
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin immediate transaction")?;

        let user = tx
            .query_row(SELECT_USER_SQL, params![user_id as i64], map_user_row)
            .optional()
            .db_context("Failed to query user")?
            .ok_or(EngineError::UserNotFound { id: user_id })?;

        let plan_id: i64 = tx
            .query_row(SELECT_CURRENT_PLAN_ID_SQL, params![user_id as i64], |row| {
                row.get(0)
            })
            .optional()
            .db_context("Failed to query current plan")?
            .ok_or(EngineError::PlanNotFound { id: 0 })?;

        let mut plan = load_plan_tree(&tx, plan_id as u64, now)?
            .ok_or(EngineError::PlanNotFound { id: plan_id as u64 })?;

        let history = history_for_plan(&tx, plan.id)?;
        policy::check_eligibility(&plan, intent, &history, now)?;

        let tz = schedule::resolve_timezone(&user.timezone);
        let slot_times = user.effective_slot_times();
        let seed = user_id.to_string();

        let mut outcome = match request {
            AdaptationRequest::ReduceLoad { slot_to_remove } => {
                engine::reduce_load(&mut plan, *slot_to_remove, now)?
            }
            AdaptationRequest::IncreaseLoad { slot_to_add } => {
                engine::increase_load(&mut plan, *slot_to_add, catalog, now)?
            }
            AdaptationRequest::LowerDifficulty => {
                engine::shift_difficulty(&mut plan, DifficultyShift::Lower, catalog, now)?
            }
            AdaptationRequest::RaiseDifficulty => {
                engine::shift_difficulty(&mut plan, DifficultyShift::Raise, catalog, now)?
            }
            AdaptationRequest::ShortenDuration { target_days } => {
                let outcome = engine::shorten_duration(&mut plan, *target_days, now)?;
                engine::recompute_end_date(&mut plan, &tz)?;
                outcome
            }
            AdaptationRequest::ExtendDuration { target_days } => {
                let outcome = engine::extend_duration(&mut plan, *target_days, catalog, &seed)?;
                engine::recompute_end_date(&mut plan, &tz)?;
                outcome
            }
            AdaptationRequest::ChangeFocus { new_focus } => {
                engine::change_main_category(&mut plan, *new_focus, catalog, &seed, now)?
            }
            AdaptationRequest::Pause => engine::pause(&mut plan, now)?,
            AdaptationRequest::Resume => engine::resume(&mut plan, &tz, &slot_times, now)?,
        };

        // Persist step mutations; insert days/steps the engine added
        // (id = 0) and collect their real ids.
        let anchor = schedule::anchor_from_start(plan.start_date, &tz);
        let mut added_ids: Vec<u64> = Vec::new();
        let mut schedule_requests: Vec<ScheduleRequest> = Vec::new();
        for day in &mut plan.days {
            if day.id == 0 {
                tx.execute(
                    "INSERT INTO plan_days (plan_id, day_number) VALUES (?1, ?2)",
                    params![plan.id as i64, day.day_number],
                )
                .db_context("Failed to insert plan day")?;
                day.id = tx.last_insert_rowid() as u64;
            }
            let day_number = day.day_number;
            let day_id = day.id;
            for step in &mut day.steps {
                if step.id == 0 {
                    step.day_id = day_id;
                    if plan.status == PlanStatus::Active {
                        step.scheduled_for = Some(schedule::compute_scheduled_for(
                            anchor,
                            day_number,
                            step.time_slot,
                            &tz,
                            &slot_times,
                        )?);
                    }
                    step.id = insert_step(&tx, step)?;
                    added_ids.push(step.id);
                    if let Some(scheduled_for) = step.scheduled_for {
                        schedule_requests.push(ScheduleRequest {
                            step_id: step.id,
                            scheduled_for,
                            timezone: user.timezone.clone(),
                        });
                    }
                } else {
                    update_step_after_adaptation(&tx, step)?;
                }
            }
        }
        if !added_ids.is_empty() {
            outcome.record_added_step_ids(added_ids);
        }
        for &step_id in &outcome.rescheduled_step_ids {
            if let Some((_, step)) = plan
                .days
                .iter()
                .flat_map(|d| d.steps.iter().map(move |s| (d.day_number, s)))
                .find(|(_, s)| s.id == step_id)
            {
                if let Some(scheduled_for) = step.scheduled_for {
                    schedule_requests.push(ScheduleRequest {
                        step_id,
                        scheduled_for,
                        timezone: user.timezone.clone(),
                    });
                }
            }
        }

        // A focus change spawns the replacement plan inside the same
        // transaction; the old plan is already paused by the engine.
        let mut new_plan: Option<Plan> = None;
        if let Some(draft) = outcome.replacement_draft.take() {
            let (new_plan_id, requests) =
                insert_plan_from_draft(&tx, &user, &draft, now, &slot_times)?;
            outcome.record_new_plan_id(new_plan_id);
            schedule_requests.extend(requests);
            new_plan = load_plan_tree(&tx, new_plan_id, now)?;
        }

        plan.adaptation_version += 1;
        update_plan_row(&tx, &plan)?;

        insert_version(&tx, plan.id, intent, &outcome.diff, now)?;
        insert_history(&tx, plan.id, intent, now)?;

        // Keep the session state in lockstep for execution-state flips.
        match plan.status {
            PlanStatus::Paused if new_plan.is_none() => {
                tx.execute(
                    UPDATE_USER_STATE_SQL,
                    params![
                        SessionState::ActivePaused.as_str(),
                        now.to_string(),
                        user_id as i64
                    ],
                )
                .db_context("Failed to update user state")?;
            }
            _ => {
                tx.execute(
                    UPDATE_USER_STATE_SQL,
                    params![
                        SessionState::Active.as_str(),
                        now.to_string(),
                        user_id as i64
                    ],
                )
                .db_context("Failed to update user state")?;
            }
        }

        let plan = load_plan_tree(&tx, plan.id, now)?.ok_or(EngineError::Integrity {
            message: format!("plan {} vanished inside adapt transaction", plan.id),
        })?;

        tx.commit().db_context("Failed to commit transaction")?;

        log::info!(
            "adaptation {} applied to plan {} (version {}): {} canceled, {} added, {} rescheduled",
            intent,
            plan.id,
            plan.adaptation_version,
            outcome.canceled_step_ids.len(),
            outcome.added_step_ids.len(),
            outcome.rescheduled_step_ids.len(),
        );

        Ok(AppliedAdaptation {
            plan,
            outcome,
            schedule_requests,
            new_plan,
        })
    }
}
