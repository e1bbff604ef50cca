//! Post-hoc invariant checks over a completed draft.
//!
//! Validators never mutate. All violations are collected and returned
//! together so a caller can report everything wrong in one pass.

use std::collections::HashMap;
use std::fmt;

use crate::models::{Draft, Duration, Load, SlotType};

/// A single validation failure. Renders to the stable code string stored
/// on the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftViolation {
    /// Draft has no steps at all
    EmptyPlan,
    /// Total day count is not the canonical count for the duration
    WrongTotalDays {
        duration: Duration,
        expected: u32,
        got: u32,
    },
    /// A day's step count does not match the load contract
    InvalidSlotCount { day: u32, expected: usize, got: usize },
    /// A day's slot-type composition does not match the load contract
    InvalidSlotComposition { day: u32, detail: &'static str },
    /// The same exercise appears on immediately consecutive days
    ConsecutiveDuplicate {
        exercise_id: String,
        first_day: u32,
        second_day: u32,
    },
}

impl fmt::Display for DraftViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPlan => write!(f, "EMPTY_PLAN"),
            Self::WrongTotalDays {
                duration,
                expected,
                got,
            } => write!(
                f,
                "WRONG_TOTAL_DAYS: got {got} days, expected {expected} for {duration}"
            ),
            Self::InvalidSlotCount { day, expected, got } => write!(
                f,
                "INVALID_SLOT_DISTRIBUTION: day {day} has {got} slots, expected {expected}"
            ),
            Self::InvalidSlotComposition { day, detail } => {
                write!(f, "INVALID_SLOT_DISTRIBUTION: day {day} {detail}")
            }
            Self::ConsecutiveDuplicate {
                exercise_id,
                first_day,
                second_day,
            } => write!(
                f,
                "CONSECUTIVE_DUPLICATE: exercise {exercise_id} used on consecutive days \
                 {first_day} and {second_day}"
            ),
        }
    }
}

/// Runs every validation rule over a completed draft.
pub fn validate_draft(draft: &Draft) -> Vec<DraftViolation> {
    let mut violations = Vec::new();

    if draft.steps.is_empty() {
        violations.push(DraftViolation::EmptyPlan);
        return violations;
    }

    let expected_days = draft.duration.total_days();
    if draft.total_days != expected_days {
        violations.push(DraftViolation::WrongTotalDays {
            duration: draft.duration,
            expected: expected_days,
            got: draft.total_days,
        });
    }

    violations.extend(validate_slot_distribution(draft));
    violations.extend(validate_no_consecutive_duplicates(draft));

    violations
}

/// Each day must carry exactly the load's slot count and slot-type
/// composition: LITE = one CORE; MID = CORE + SUPPORT; INTENSIVE =
/// CORE + SUPPORT + at least one of EMERGENCY/REST.
fn validate_slot_distribution(draft: &Draft) -> Vec<DraftViolation> {
    let mut violations = Vec::new();
    let expected = draft.load.slots_per_day();

    let mut days: HashMap<u32, Vec<SlotType>> = HashMap::new();
    for step in &draft.steps {
        days.entry(step.day_number).or_default().push(step.slot_type);
    }

    let mut day_numbers: Vec<u32> = days.keys().copied().collect();
    day_numbers.sort_unstable();

    for day in day_numbers {
        let slot_types = &days[&day];
        if slot_types.len() != expected {
            violations.push(DraftViolation::InvalidSlotCount {
                day,
                expected,
                got: slot_types.len(),
            });
        }

        match draft.load {
            Load::Lite => {
                if !slot_types.contains(&SlotType::Core) {
                    violations.push(DraftViolation::InvalidSlotComposition {
                        day,
                        detail: "missing required CORE slot for LITE load",
                    });
                }
            }
            Load::Mid => {
                if !slot_types.contains(&SlotType::Core)
                    || !slot_types.contains(&SlotType::Support)
                {
                    violations.push(DraftViolation::InvalidSlotComposition {
                        day,
                        detail: "missing required CORE and SUPPORT slots for MID load",
                    });
                }
            }
            Load::Intensive => {
                if !slot_types.contains(&SlotType::Core)
                    || !slot_types.contains(&SlotType::Support)
                {
                    violations.push(DraftViolation::InvalidSlotComposition {
                        day,
                        detail: "missing CORE or SUPPORT for INTENSIVE load",
                    });
                }
                if !slot_types
                    .iter()
                    .any(|s| matches!(s, SlotType::Emergency | SlotType::Rest))
                {
                    violations.push(DraftViolation::InvalidSlotComposition {
                        day,
                        detail: "missing EMERGENCY or REST slot for INTENSIVE load",
                    });
                }
            }
        }
    }

    violations
}

/// The same exercise id must not appear on two immediately consecutive
/// days anywhere in the draft.
fn validate_no_consecutive_duplicates(draft: &Draft) -> Vec<DraftViolation> {
    let mut violations = Vec::new();

    let mut by_day: HashMap<u32, Vec<&str>> = HashMap::new();
    for step in &draft.steps {
        by_day
            .entry(step.day_number)
            .or_default()
            .push(&step.exercise_id);
    }

    let mut day_numbers: Vec<u32> = by_day.keys().copied().collect();
    day_numbers.sort_unstable();

    for &day in &day_numbers {
        let Some(previous) = day.checked_sub(1).and_then(|d| by_day.get(&d)) else {
            continue;
        };
        for exercise_id in &by_day[&day] {
            if previous.contains(exercise_id) {
                violations.push(DraftViolation::ConsecutiveDuplicate {
                    exercise_id: (*exercise_id).to_string(),
                    first_day: day - 1,
                    second_day: day,
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DraftStep, Focus, TimeSlot};
    use jiff::Timestamp;

    fn step(day: u32, index: u32, exercise_id: &str, slot_type: SlotType) -> DraftStep {
        DraftStep {
            step_id: format!("step_{day}_{index}"),
            day_number: day,
            exercise_id: exercise_id.to_string(),
            exercise_name: exercise_id.to_string(),
            category: Focus::Somatic,
            impact_areas: vec![],
            slot_type,
            time_slot: TimeSlot::Morning,
            difficulty: 1,
            energy_cost: "LOW".to_string(),
        }
    }

    fn draft(load: Load, total_days: u32, steps: Vec<DraftStep>) -> Draft {
        Draft {
            id: "draft_test".to_string(),
            duration: Duration::Short,
            focus: Focus::Somatic,
            load,
            total_days,
            steps,
            source_exercises: vec![],
            validation_errors: vec![],
            created_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_empty_draft_short_circuits() {
        let violations = validate_draft(&draft(Load::Lite, 7, vec![]));
        assert_eq!(violations, vec![DraftViolation::EmptyPlan]);
    }

    #[test]
    fn test_wrong_total_days_flagged() {
        let steps = vec![step(1, 0, "a", SlotType::Core)];
        let violations = validate_draft(&draft(Load::Lite, 10, steps));
        assert!(violations
            .iter()
            .any(|v| matches!(v, DraftViolation::WrongTotalDays { got: 10, .. })));
    }

    #[test]
    fn test_mid_day_missing_support_flagged() {
        let steps = vec![
            step(1, 0, "a", SlotType::Core),
            step(1, 1, "b", SlotType::Core),
        ];
        let violations = validate_slot_distribution(&draft(Load::Mid, 7, steps));
        assert!(violations
            .iter()
            .any(|v| matches!(v, DraftViolation::InvalidSlotComposition { day: 1, .. })));
    }

    #[test]
    fn test_intensive_requires_emergency_or_rest() {
        let steps = vec![
            step(1, 0, "a", SlotType::Core),
            step(1, 1, "b", SlotType::Support),
            step(1, 2, "c", SlotType::Support),
        ];
        let violations = validate_slot_distribution(&draft(Load::Intensive, 7, steps));
        assert_eq!(violations.len(), 1);

        let ok = vec![
            step(1, 0, "a", SlotType::Core),
            step(1, 1, "b", SlotType::Support),
            step(1, 2, "c", SlotType::Rest),
        ];
        assert!(validate_slot_distribution(&draft(Load::Intensive, 7, ok)).is_empty());
    }

    #[test]
    fn test_consecutive_duplicate_detected() {
        let steps = vec![
            step(1, 0, "same", SlotType::Core),
            step(2, 0, "same", SlotType::Core),
            step(3, 0, "other", SlotType::Core),
        ];
        let violations = validate_no_consecutive_duplicates(&draft(Load::Lite, 7, steps));
        assert_eq!(
            violations,
            vec![DraftViolation::ConsecutiveDuplicate {
                exercise_id: "same".to_string(),
                first_day: 1,
                second_day: 2,
            }]
        );
    }

    #[test]
    fn test_day_gap_is_not_consecutive() {
        let steps = vec![
            step(1, 0, "same", SlotType::Core),
            step(3, 0, "same", SlotType::Core),
        ];
        assert!(validate_no_consecutive_duplicates(&draft(Load::Lite, 7, steps)).is_empty());
    }

    #[test]
    fn test_violations_are_collected_not_short_circuited() {
        let steps = vec![
            step(1, 0, "same", SlotType::Support),
            step(2, 0, "same", SlotType::Core),
        ];
        let violations = validate_draft(&draft(Load::Lite, 7, steps));
        // wrong total days is absent, but composition and duplicate both present
        assert!(violations.len() >= 2);
    }
}
