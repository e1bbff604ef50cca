//! Draft model definitions: the unactivated candidate plan.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Duration, Focus, Load, SlotType, TimeSlot};

/// A single composed step inside a draft. Becomes a live [`PlanStep`]
/// when the draft is finalized.
///
/// [`PlanStep`]: super::PlanStep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftStep {
    /// Stable identifier within the draft (`step_<day>_<index>`)
    pub step_id: String,

    /// 1-based day the step belongs to
    pub day_number: u32,

    /// Catalog exercise backing the step
    pub exercise_id: String,

    /// Catalog-internal exercise name
    pub exercise_name: String,

    /// Category of the chosen exercise (may differ from the plan focus
    /// after a smart fallback)
    pub category: Focus,

    /// Impact-area tags of the chosen exercise
    pub impact_areas: Vec<String>,

    /// Functional role of the step within its day
    pub slot_type: SlotType,

    /// Wall-clock period the step is delivered in
    pub time_slot: TimeSlot,

    /// Difficulty of the chosen exercise (1-3)
    pub difficulty: u8,

    /// Energy cost tag of the chosen exercise
    pub energy_cost: String,
}

/// Complete plan draft artifact: composed, validated, and pending user
/// confirmation. A user has at most one draft; composing again replaces
/// it outright.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    /// Unique identifier for the draft
    pub id: String,

    pub duration: Duration,
    pub focus: Focus,
    pub load: Load,

    /// Canonical day count for the duration
    pub total_days: u32,

    /// Ordered steps, day-major
    pub steps: Vec<DraftStep>,

    /// Catalog ids that were available to the composition run
    pub source_exercises: Vec<String>,

    /// Validator output; empty means the draft is valid
    #[serde(default)]
    pub validation_errors: Vec<String>,

    /// Timestamp when the draft was composed (UTC)
    pub created_at: Timestamp,
}

impl Draft {
    /// True when the draft passed every validation rule.
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Distinct time slots used on day 1, in first-seen order. Feeds the
    /// activation anchor resolution.
    pub fn day_one_slots(&self) -> Vec<TimeSlot> {
        let mut seen = Vec::new();
        for step in self.steps.iter().filter(|s| s.day_number == 1) {
            if !seen.contains(&step.time_slot) {
                seen.push(step.time_slot);
            }
        }
        seen
    }
}
