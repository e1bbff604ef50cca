//! Adaptation mutations over a live plan.
//!
//! Every function here operates on the in-memory [`Plan`] and returns an
//! [`AdaptationOutcome`] describing what changed. External side effects
//! (cancelling or arranging delivery jobs) are returned as step-id lists
//! rather than invoked in-line, so the caller can sequence them strictly
//! after its transaction commits. Terminal steps (completed or skipped)
//! are never touched.
//!
//! Steps added by an adaptation are appended to the plan with `id = 0`;
//! the persistence layer assigns real ids and calls
//! [`AdaptationOutcome::record_added_step_ids`].

use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde_json::json;

use crate::adaptation::intent::AdaptationIntent;
use crate::catalog::Catalog;
use crate::composer::{build_draft, rules};
use crate::error::{EngineError, Result};
use crate::models::{
    Draft, Duration, Focus, Load, Plan, PlanParameters, PlanStatus, PlanStep, SlotType, TimeSlot,
    UserPolicy,
};
use crate::schedule::{self, SlotTimes};

/// The result of one applied adaptation: which steps to cancel, add, or
/// reschedule externally, plus the version-log diff payload.
#[derive(Debug, Clone)]
pub struct AdaptationOutcome {
    pub intent: AdaptationIntent,
    /// Steps whose pending deliveries must be retracted post-commit
    pub canceled_step_ids: Vec<u64>,
    /// Steps whose deliveries must be (re)arranged post-commit
    pub rescheduled_step_ids: Vec<u64>,
    /// Real ids of steps created by this adaptation; filled by the
    /// persistence layer once inserts have run
    pub added_step_ids: Vec<u64>,
    /// Diff payload for the appended plan version row
    pub diff: serde_json::Value,
    /// For focus changes: the fully built replacement draft the caller
    /// must activate as the user's new plan
    pub replacement_draft: Option<Draft>,
}

impl AdaptationOutcome {
    fn new(intent: AdaptationIntent, diff: serde_json::Value) -> Self {
        Self {
            intent,
            canceled_step_ids: Vec::new(),
            rescheduled_step_ids: Vec::new(),
            added_step_ids: Vec::new(),
            diff,
            replacement_draft: None,
        }
    }

    /// Records the database ids assigned to steps this adaptation added,
    /// both on the outcome and inside the diff payload.
    pub fn record_added_step_ids(&mut self, ids: Vec<u64>) {
        if let Some(obj) = self.diff.as_object_mut() {
            obj.insert("added_step_ids".to_string(), json!(ids));
        }
        self.added_step_ids = ids;
    }

    /// Records the id of the plan spawned by a focus change.
    pub fn record_new_plan_id(&mut self, plan_id: u64) {
        if let Some(obj) = self.diff.as_object_mut() {
            obj.insert("new_plan_id".to_string(), json!(plan_id));
        }
    }
}

/// Cancels every future step in one time slot and drops the slot from
/// the plan, recomputing the load from the remaining slot count.
pub fn reduce_load(
    plan: &mut Plan,
    slot_to_remove: TimeSlot,
    effective_from: Timestamp,
) -> Result<AdaptationOutcome> {
    if plan.preferred_time_slots.len() <= 1 {
        return Err(EngineError::not_eligible("already_at_minimum_load"));
    }
    if !plan.preferred_time_slots.contains(&slot_to_remove) {
        return Err(EngineError::not_eligible("slot_not_in_plan"));
    }

    let mut canceled: Vec<u64> = Vec::new();
    for (_, step) in plan.future_steps_mut(effective_from) {
        if step.time_slot == slot_to_remove {
            step.canceled_by_adaptation = true;
            step.scheduled_for = None;
            canceled.push(step.id);
        }
    }
    if canceled.is_empty() {
        return Err(EngineError::not_eligible("no_future_steps_in_slot"));
    }

    let old_load = plan.load;
    plan.preferred_time_slots.retain(|s| *s != slot_to_remove);
    plan.load = load_for_slot_count(plan.preferred_time_slots.len())?;

    let diff = json!({
        "slot_removed": slot_to_remove,
        "canceled_step_ids": canceled,
        "old_load": old_load,
        "new_load": plan.load,
        "preferred_time_slots": plan.preferred_time_slots,
    });

    let mut outcome = AdaptationOutcome::new(AdaptationIntent::ReduceDailyLoad, diff);
    outcome.canceled_step_ids = canceled;
    Ok(outcome)
}

/// Adds one step per remaining day in a new time slot. Going from two
/// slots to three auto-selects the only missing slot; going from one to
/// two requires an explicit target.
pub fn increase_load(
    plan: &mut Plan,
    slot_to_add: Option<TimeSlot>,
    catalog: &Catalog,
    effective_from: Timestamp,
) -> Result<AdaptationOutcome> {
    if plan.preferred_time_slots.len() >= 3 {
        return Err(EngineError::not_eligible("already_at_maximum_load"));
    }

    let missing: Vec<TimeSlot> = TimeSlot::ALL
        .into_iter()
        .filter(|s| !plan.preferred_time_slots.contains(s))
        .collect();

    let new_slot = match (slot_to_add, missing.as_slice()) {
        (_, [only]) => *only,
        (Some(slot), candidates) if candidates.contains(&slot) => slot,
        _ => return Err(EngineError::not_eligible("slot_missing_or_invalid")),
    };

    let old_load = plan.load;
    let new_load = load_for_slot_count(plan.preferred_time_slots.len() + 1)?;
    // The new structural slot is whatever the bigger load contract adds.
    let new_slot_type = added_slot_type(old_load, new_load);

    let focus = plan.focus;
    let start = plan.start_date;
    let mut added = 0usize;
    for day in &mut plan.days {
        // Only days that still have something ahead of them get the new
        // slot; the difficulty reference is the day's first future step.
        let day_number = day.day_number;
        let Some(reference) = day.steps.iter().find(|s| {
            s.is_future() && crate::models::plan::step_anchor(start, day_number, s) >= effective_from
        }) else {
            continue;
        };
        let reference_difficulty = reference.difficulty;
        let used_today: Vec<String> = day.steps.iter().map(|s| s.exercise_id.clone()).collect();

        let Some(exercise) =
            pick_additional_exercise(catalog, focus, reference_difficulty, &used_today)
        else {
            continue;
        };

        let order_in_day = day.steps.iter().map(|s| s.order_in_day + 1).max().unwrap_or(0);
        day.steps.push(PlanStep {
            id: 0,
            day_id: day.id,
            plan_id: plan.id,
            exercise_id: exercise.id.clone(),
            slot_type: new_slot_type,
            time_slot: new_slot,
            category: exercise.category,
            difficulty: exercise.difficulty,
            order_in_day,
            is_completed: false,
            skipped: false,
            canceled_by_adaptation: false,
            scheduled_for: None,
            completed_at: None,
        });
        added += 1;
    }

    if added == 0 {
        return Err(EngineError::not_eligible("no_future_days_to_add_steps_to"));
    }

    plan.preferred_time_slots.push(new_slot);
    plan.preferred_time_slots.sort();
    plan.load = new_load;

    let diff = json!({
        "slot_added": new_slot,
        "added_step_ids": [],
        "old_load": old_load,
        "new_load": plan.load,
        "preferred_time_slots": plan.preferred_time_slots,
    });

    Ok(AdaptationOutcome::new(AdaptationIntent::IncreaseDailyLoad, diff))
}

/// Cancels every future step beyond the target day and shrinks the
/// plan. The caller recomputes the end date afterwards via
/// [`recompute_end_date`] (it knows the user's timezone).
pub fn shorten_duration(
    plan: &mut Plan,
    target_days: u32,
    effective_from: Timestamp,
) -> Result<AdaptationOutcome> {
    let duration = Duration::from_days(target_days)
        .ok_or(EngineError::InvalidDuration {
            value: i64::from(target_days),
        })?;
    if target_days >= plan.total_days {
        return Err(EngineError::not_eligible("target_not_less_than_current"));
    }
    if plan.current_day > target_days {
        return Err(EngineError::not_eligible("current_day_exceeds_target"));
    }

    let mut canceled: Vec<u64> = Vec::new();
    for (day_number, step) in plan.future_steps_mut(effective_from) {
        if day_number > target_days {
            step.canceled_by_adaptation = true;
            step.scheduled_for = None;
            canceled.push(step.id);
        }
    }

    let old_total = plan.total_days;
    plan.total_days = target_days;
    plan.duration = duration;

    let diff = json!({
        "old_total_days": old_total,
        "new_total_days": target_days,
        "shortened_from_day": plan.current_day,
        "canceled_step_ids": canceled,
    });

    let mut outcome = AdaptationOutcome::new(AdaptationIntent::ShortenPlanDuration, diff);
    outcome.canceled_step_ids = canceled;
    Ok(outcome)
}

/// Regenerates a fresh draft for the added day range only and splices
/// the new days onto the plan. Existing days and steps are untouched.
pub fn extend_duration(
    plan: &mut Plan,
    target_days: u32,
    catalog: &Catalog,
    user_seed: &str,
) -> Result<AdaptationOutcome> {
    let duration = Duration::from_days(target_days)
        .ok_or(EngineError::InvalidDuration {
            value: i64::from(target_days),
        })?;
    if target_days <= plan.total_days {
        return Err(EngineError::not_eligible("target_not_greater_than_current"));
    }
    if plan.current_day >= plan.total_days {
        return Err(EngineError::not_eligible("plan_already_finished"));
    }

    let params = PlanParameters {
        duration: Some(duration),
        focus: Some(plan.focus),
        load: Some(plan.load),
        policy: UserPolicy {
            preferred_time_slots: plan.preferred_time_slots.clone(),
            ..Default::default()
        },
    };
    // Built before any mutation: a failed draft leaves the plan intact.
    let draft = build_draft(&params, catalog, user_seed)?;

    let old_total = plan.total_days;
    let mut added = 0usize;
    for day_number in (old_total + 1)..=target_days {
        let day_steps: Vec<_> = draft
            .steps
            .iter()
            .filter(|s| s.day_number == day_number)
            .collect();
        let mut day = crate::models::PlanDay {
            id: 0,
            plan_id: plan.id,
            day_number,
            steps: Vec::new(),
        };
        for (order, draft_step) in day_steps.iter().enumerate() {
            day.steps.push(PlanStep {
                id: 0,
                day_id: 0,
                plan_id: plan.id,
                exercise_id: draft_step.exercise_id.clone(),
                slot_type: draft_step.slot_type,
                time_slot: draft_step.time_slot,
                category: draft_step.category,
                difficulty: draft_step.difficulty,
                order_in_day: order as u32,
                is_completed: false,
                skipped: false,
                canceled_by_adaptation: false,
                scheduled_for: None,
                completed_at: None,
            });
            added += 1;
        }
        plan.days.push(day);
    }

    plan.total_days = target_days;
    plan.duration = duration;

    let diff = json!({
        "old_total_days": old_total,
        "new_total_days": target_days,
        "days_added": target_days - old_total,
        "extended_from_day": plan.current_day,
        "added_step_ids": [],
    });

    log::debug!("extend_duration added {added} steps across {} days", target_days - old_total);
    Ok(AdaptationOutcome::new(AdaptationIntent::ExtendPlanDuration, diff))
}

/// Pauses the old plan (future steps cancelled) and builds a brand-new
/// draft with the new focus but the same duration and load. The caller
/// persists the draft as the user's new active plan.
///
/// Atomic by construction: the draft is built before the old plan is
/// touched, so an insufficient library leaves everything unchanged.
pub fn change_main_category(
    plan: &mut Plan,
    new_focus: Focus,
    catalog: &Catalog,
    user_seed: &str,
    effective_from: Timestamp,
) -> Result<AdaptationOutcome> {
    if new_focus == plan.focus {
        return Err(EngineError::not_eligible("focus_unchanged"));
    }

    let params = PlanParameters {
        duration: Some(plan.duration),
        focus: Some(new_focus),
        load: Some(plan.load),
        policy: UserPolicy {
            preferred_time_slots: plan.preferred_time_slots.clone(),
            ..Default::default()
        },
    };
    let draft = build_draft(&params, catalog, user_seed)?;
    if !draft.is_valid() {
        return Err(EngineError::DraftInvalid {
            id: draft.id,
            errors: draft.validation_errors,
        });
    }

    let mut canceled: Vec<u64> = Vec::new();
    for (_, step) in plan.future_steps_mut(effective_from) {
        step.canceled_by_adaptation = true;
        step.scheduled_for = None;
        canceled.push(step.id);
    }
    let previous_focus = plan.focus;
    plan.status = PlanStatus::Paused;

    let diff = json!({
        "previous_focus": previous_focus,
        "new_focus": new_focus,
        "canceled_step_ids": canceled,
        "new_plan_id": null,
    });

    let mut outcome = AdaptationOutcome::new(AdaptationIntent::ChangeMainCategory, diff);
    outcome.canceled_step_ids = canceled;
    outcome.replacement_draft = Some(draft);
    Ok(outcome)
}

/// Suspends execution: future steps lose their schedule, the plan keeps
/// its structure.
pub fn pause(plan: &mut Plan, effective_from: Timestamp) -> Result<AdaptationOutcome> {
    if plan.status == PlanStatus::Paused {
        return Err(EngineError::not_eligible("already_paused"));
    }
    if plan.status != PlanStatus::Active {
        return Err(EngineError::not_eligible("plan_not_active"));
    }

    let mut unscheduled: Vec<u64> = Vec::new();
    for (_, step) in plan.future_steps_mut(effective_from) {
        if step.scheduled_for.take().is_some() {
            unscheduled.push(step.id);
        }
    }
    plan.status = PlanStatus::Paused;

    let diff = json!({
        "execution_state": "paused",
        "unscheduled_step_ids": unscheduled,
    });

    let mut outcome = AdaptationOutcome::new(AdaptationIntent::PausePlan, diff);
    outcome.canceled_step_ids = unscheduled;
    Ok(outcome)
}

/// Resumes execution: recomputes `scheduled_for` for every future step
/// from its original day-number anchor, using the user's *current*
/// slot-time preferences.
pub fn resume(
    plan: &mut Plan,
    tz: &TimeZone,
    slot_times: &SlotTimes,
    effective_from: Timestamp,
) -> Result<AdaptationOutcome> {
    if plan.status != PlanStatus::Paused {
        return Err(EngineError::not_eligible("not_paused"));
    }

    let anchor = schedule::anchor_from_start(plan.start_date, tz);
    let start = plan.start_date;
    let mut rescheduled: Vec<u64> = Vec::new();
    for day in &mut plan.days {
        let day_number = day.day_number;
        for step in day.steps.iter_mut().filter(|s| {
            s.is_future() && crate::models::plan::step_anchor(start, day_number, s) >= effective_from
        }) {
            step.scheduled_for = Some(schedule::compute_scheduled_for(
                anchor,
                day_number,
                step.time_slot,
                tz,
                slot_times,
            )?);
            rescheduled.push(step.id);
        }
    }
    plan.status = PlanStatus::Active;

    let diff = json!({
        "execution_state": "active",
        "rescheduled_step_ids": rescheduled,
    });

    let mut outcome = AdaptationOutcome::new(AdaptationIntent::ResumePlan, diff);
    outcome.rescheduled_step_ids = rescheduled;
    Ok(outcome)
}

/// Direction of a difficulty shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyShift {
    Lower,
    Raise,
}

/// Re-picks exercises for future steps one difficulty level down or up
/// (clamped to 1–3). Steps with no suitable replacement keep their
/// exercise; the adaptation fails only when nothing could shift at all.
pub fn shift_difficulty(
    plan: &mut Plan,
    shift: DifficultyShift,
    catalog: &Catalog,
    effective_from: Timestamp,
) -> Result<AdaptationOutcome> {
    let (intent, at_limit_reason) = match shift {
        DifficultyShift::Lower => (
            AdaptationIntent::LowerDifficulty,
            "already_at_minimum_difficulty",
        ),
        DifficultyShift::Raise => (
            AdaptationIntent::IncreaseDifficulty,
            "already_at_maximum_difficulty",
        ),
    };

    let start = plan.start_date;
    let mut adjusted: Vec<u64> = Vec::new();
    for day in &mut plan.days {
        let day_number = day.day_number;
        let used_today: Vec<String> = day.steps.iter().map(|s| s.exercise_id.clone()).collect();
        for step in day.steps.iter_mut().filter(|s| {
            s.is_future() && crate::models::plan::step_anchor(start, day_number, s) >= effective_from
        }) {
            let target = match shift {
                DifficultyShift::Lower => step.difficulty.saturating_sub(1).max(1),
                DifficultyShift::Raise => (step.difficulty + 1).min(3),
            };
            if target == step.difficulty {
                continue;
            }
            let Some(replacement) = pick_replacement_exercise(
                catalog,
                step.category,
                step.slot_type,
                target,
                &used_today,
            ) else {
                continue;
            };
            step.exercise_id = replacement.id.clone();
            step.difficulty = replacement.difficulty;
            adjusted.push(step.id);
        }
    }

    if adjusted.is_empty() {
        return Err(EngineError::not_eligible(at_limit_reason));
    }

    let diff = json!({
        "direction": match shift {
            DifficultyShift::Lower => "lower",
            DifficultyShift::Raise => "raise",
        },
        "adjusted_step_ids": adjusted,
    });

    let mut outcome = AdaptationOutcome::new(intent, diff);
    outcome.rescheduled_step_ids = adjusted;
    Ok(outcome)
}

fn load_for_slot_count(count: usize) -> Result<Load> {
    Load::from_slot_count(count).ok_or_else(|| EngineError::Integrity {
        message: format!("no load maps to {count} daily slots"),
    })
}

/// The slot type the bigger load contract introduces over the smaller.
fn added_slot_type(old: Load, new: Load) -> SlotType {
    let old_structure = old.slot_structure();
    new.slot_structure()
        .iter()
        .find(|s| !old_structure.contains(s))
        .copied()
        .unwrap_or(SlotType::Support)
}

/// Picks the exercise for a step added by increase-load: at or below the
/// day's reference difficulty, matching the plan focus, not yet used
/// that day; falls back to any unused active exercise.
fn pick_additional_exercise<'a>(
    catalog: &'a Catalog,
    focus: Focus,
    max_difficulty: u8,
    used_today: &[String],
) -> Option<&'a crate::catalog::Exercise> {
    let unused: Vec<&crate::catalog::Exercise> = catalog
        .active_exercises()
        .into_iter()
        .filter(|e| !used_today.contains(&e.id))
        .collect();

    let preferred: Vec<&crate::catalog::Exercise> = unused
        .iter()
        .filter(|e| e.category == focus && e.difficulty <= max_difficulty)
        .copied()
        .collect();

    let pool = if preferred.is_empty() { &unused } else { &preferred };
    pool.iter()
        .min_by(|a, b| rules::candidate_order("", a, b))
        .copied()
}

/// Picks a same-category, same-tier exercise at exactly the target
/// difficulty for a difficulty shift.
fn pick_replacement_exercise<'a>(
    catalog: &'a Catalog,
    category: Focus,
    slot_type: SlotType,
    target_difficulty: u8,
    used_today: &[String],
) -> Option<&'a crate::catalog::Exercise> {
    catalog
        .active_exercises()
        .into_iter()
        .filter(|e| {
            e.category == category
                && e.priority_tier == slot_type
                && e.difficulty == target_difficulty
                && !used_today.contains(&e.id)
        })
        .min_by(|a, b| rules::candidate_order("", a, b))
}

fn end_date_for(
    start: jiff::Timestamp,
    total_days: u32,
    tz: &TimeZone,
) -> Result<jiff::Timestamp> {
    use jiff::ToSpan;
    start
        .to_zoned(tz.clone())
        .checked_add(i64::from(total_days).days())
        .map(|z| z.timestamp())
        .map_err(|e| EngineError::Timezone {
            message: format!("failed to derive end date: {e}"),
        })
}

/// Recomputes the plan's end date after a duration change; exposed for
/// the persistence layer, which knows the user's timezone.
pub fn recompute_end_date(plan: &mut Plan, tz: &TimeZone) -> Result<()> {
    plan.end_date = Some(end_date_for(plan.start_date, plan.total_days, tz)?);
    Ok(())
}
