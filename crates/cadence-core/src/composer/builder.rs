//! Deterministic draft composition.
//!
//! [`build_draft`] is a pure function over its inputs: parameters,
//! catalog, and seed. It never touches a clock for anything that affects
//! the step sequence, so identical inputs always produce byte-identical
//! drafts (required for reproducible previews and tests).

use std::collections::HashMap;

use jiff::Timestamp;

use crate::catalog::{Catalog, Exercise};
use crate::composer::rules;
use crate::composer::validators::validate_draft;
use crate::error::{EngineError, Result};
use crate::models::{Draft, DraftStep, PlanParameters, TimeSlot};

/// Tracks the last day each exercise was used during one composition
/// run. Owned by the single [`build_draft`] call and discarded with it.
#[derive(Debug, Default)]
struct CooldownLedger {
    last_used: HashMap<String, u32>,
}

impl CooldownLedger {
    /// `cooldown_days = N` forbids reuse for the N days after the last
    /// use; `cooldown_days = 1` means "not on consecutive days".
    fn in_cooldown(&self, exercise: &Exercise, current_day: u32) -> bool {
        match self.last_used.get(&exercise.id) {
            Some(&last) => current_day - last <= exercise.cooldown_days,
            None => false,
        }
    }

    fn record(&mut self, exercise_id: &str, day: u32) {
        self.last_used.insert(exercise_id.to_string(), day);
    }
}

/// Composes a draft from the three pillars and the content catalog.
///
/// The `user_seed` feeds the deterministic tie-break between equally
/// weighted candidates; pass an empty string for plain name/id ordering.
///
/// # Errors
///
/// * [`EngineError::ThreePillarsMissing`] when duration, focus, or load
///   is unset
/// * [`EngineError::SlotCountMismatch`] when the policy's preferred time
///   slots do not match the load's slots-per-day contract
/// * [`EngineError::InsufficientLibrary`] when the catalog cannot fill a
///   slot even with every fallback exhausted
pub fn build_draft(params: &PlanParameters, catalog: &Catalog, user_seed: &str) -> Result<Draft> {
    let (duration, focus, load) = match (params.duration, params.focus, params.load) {
        (Some(d), Some(f), Some(l)) => (d, f, l),
        _ => {
            return Err(EngineError::ThreePillarsMissing {
                missing: params.missing_pillars(),
            })
        }
    };

    let expected_slots = load.slots_per_day();
    let preferred_slots = &params.policy.preferred_time_slots;
    if preferred_slots.len() != expected_slots {
        return Err(EngineError::SlotCountMismatch {
            load: load.as_str().to_string(),
            expected: expected_slots,
            got: preferred_slots.len(),
        });
    }

    let active = catalog.active_exercises();
    if active.is_empty() {
        return Err(EngineError::InsufficientLibrary {
            reason: "content library has no active exercises".to_string(),
        });
    }

    let total_days = duration.total_days();
    let total_slots = total_days as usize * expected_slots;
    let mut distribution = rules::category_distribution(focus, total_slots);

    let mut ledger = CooldownLedger::default();
    let mut steps: Vec<DraftStep> = Vec::with_capacity(total_slots);

    for day in 1..=total_days {
        let week_number = ((day - 1) / 7) + 1;
        let max_difficulty = rules::difficulty_ceiling(week_number, duration);

        let mut used_slots_today: Vec<TimeSlot> = Vec::with_capacity(expected_slots);

        for (slot_index, &slot_type) in load.slot_structure().iter().enumerate() {
            let category = rules::pick_category(&distribution, focus);
            let seed = format!("{user_seed}:{day}:{slot_index}");

            let fresh: Vec<&Exercise> = active
                .iter()
                .filter(|e| !ledger.in_cooldown(e, day))
                .copied()
                .collect();

            let exercise = rules::select_exercise_with_fallback(
                &fresh,
                category,
                slot_type,
                max_difficulty,
                &params.policy,
                &seed,
            )
            // Cooldown is a soft constraint: retry the whole fallback
            // chain over every active exercise before declaring the
            // library too small.
            .or_else(|| {
                rules::select_exercise_with_fallback(
                    &active,
                    category,
                    slot_type,
                    max_difficulty,
                    &params.policy,
                    &seed,
                )
            })
            .ok_or_else(|| EngineError::InsufficientLibrary {
                reason: format!("no exercise found for day {day}, slot {slot_type}"),
            })?;

            let time_slot =
                rules::pick_time_slot(slot_type, preferred_slots, &used_slots_today);
            used_slots_today.push(time_slot);

            steps.push(DraftStep {
                step_id: format!("step_{day}_{slot_index}"),
                day_number: day,
                exercise_id: exercise.id.clone(),
                exercise_name: exercise.internal_name.clone(),
                category: exercise.category,
                impact_areas: exercise.impact_areas.clone(),
                slot_type,
                time_slot,
                difficulty: exercise.difficulty,
                energy_cost: exercise.energy_cost.clone(),
            });

            rules::consume_category(&mut distribution, category);
            ledger.record(&exercise.id, day);
        }
    }

    let mut draft = Draft {
        id: draft_id(user_seed, &steps),
        duration,
        focus,
        load,
        total_days,
        steps,
        source_exercises: active.iter().map(|e| e.id.clone()).collect(),
        validation_errors: Vec::new(),
        created_at: Timestamp::now(),
    };

    draft.validation_errors = validate_draft(&draft)
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(draft)
}

/// Derives a stable draft id from the seed and composed content. Content
/// addressing keeps the builder free of randomness.
fn draft_id(user_seed: &str, steps: &[DraftStep]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(PRIME);
        }
    };
    feed(user_seed.as_bytes());
    for step in steps {
        feed(step.step_id.as_bytes());
        feed(step.exercise_id.as_bytes());
    }
    format!("draft_{hash:016x}")
}
