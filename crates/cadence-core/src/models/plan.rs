//! Live plan model definitions.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Duration, Focus, Load, PlanStatus, SlotType, TimeSlot};

/// An activated, running plan with scheduled steps and mutable
/// execution state. Owns its days and steps exclusively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Unique identifier for the plan
    pub id: u64,

    /// Owning user
    pub user_id: u64,

    pub status: PlanStatus,

    pub duration: Duration,
    pub focus: Focus,
    pub load: Load,

    /// Current total day count; changes under duration adaptations
    pub total_days: u32,

    /// 1-based day the user is currently on
    pub current_day: u32,

    /// Monotonic counter incremented by every structural adaptation
    pub adaptation_version: u32,

    /// Daily time slots currently in use, in delivery order
    pub preferred_time_slots: Vec<TimeSlot>,

    /// UTC instant of local midnight on the plan's anchor date
    pub start_date: Timestamp,

    /// Expected end instant; recomputed by duration adaptations
    pub end_date: Option<Timestamp>,

    /// Timestamp when the plan was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the plan was last modified (UTC)
    pub updated_at: Timestamp,

    /// Associated days (eagerly loaded with their steps)
    #[serde(default)]
    pub days: Vec<PlanDay>,
}

/// One calendar day of a live plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanDay {
    pub id: u64,
    pub plan_id: u64,

    /// 1-based position within the plan
    pub day_number: u32,

    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

/// An individual step of a live plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    pub id: u64,
    pub day_id: u64,
    pub plan_id: u64,

    /// Catalog exercise backing the step
    pub exercise_id: String,

    pub slot_type: SlotType,
    pub time_slot: TimeSlot,
    pub category: Focus,
    pub difficulty: u8,

    /// Position within the day (0-indexed)
    pub order_in_day: u32,

    pub is_completed: bool,
    pub skipped: bool,

    /// Set when an adaptation removed this step from delivery
    pub canceled_by_adaptation: bool,

    /// Next delivery instant; `None` means not currently scheduled
    pub scheduled_for: Option<Timestamp>,

    /// When the user completed the step
    pub completed_at: Option<Timestamp>,
}

impl PlanStep {
    /// A step is terminal iff completed or skipped. Terminal steps are
    /// never mutated by adaptation.
    pub fn is_terminal(&self) -> bool {
        self.is_completed || self.skipped
    }

    /// True for steps adaptations may still touch: not terminal and not
    /// already removed by a previous adaptation.
    pub fn is_future(&self) -> bool {
        !self.is_terminal() && !self.canceled_by_adaptation
    }
}

/// The instant a step is anchored to: its schedule when present,
/// otherwise the plan start plus whole 24-hour day offsets (matching
/// how unscheduled steps are reasoned about everywhere else).
pub fn step_anchor(start_date: Timestamp, day_number: u32, step: &PlanStep) -> Timestamp {
    if let Some(scheduled) = step.scheduled_for {
        return scheduled;
    }
    let offset_seconds = 86_400 * i64::from(day_number.saturating_sub(1));
    Timestamp::from_second(start_date.as_second() + offset_seconds).unwrap_or(start_date)
}

impl Plan {
    /// Iterates all future steps with their day numbers: non-terminal,
    /// not removed by a previous adaptation, and anchored at or after
    /// `effective_from`.
    pub fn future_steps(
        &self,
        effective_from: Timestamp,
    ) -> impl Iterator<Item = (u32, &PlanStep)> {
        let start = self.start_date;
        self.days.iter().flat_map(move |day| {
            let day_number = day.day_number;
            day.steps
                .iter()
                .filter(move |s| {
                    s.is_future() && step_anchor(start, day_number, s) >= effective_from
                })
                .map(move |s| (day_number, s))
        })
    }

    /// Mutable variant of [`future_steps`](Self::future_steps).
    pub fn future_steps_mut(
        &mut self,
        effective_from: Timestamp,
    ) -> impl Iterator<Item = (u32, &mut PlanStep)> {
        let start = self.start_date;
        self.days.iter_mut().flat_map(move |day| {
            let day_number = day.day_number;
            day.steps
                .iter_mut()
                .filter(move |s| {
                    s.is_future() && step_anchor(start, day_number, s) >= effective_from
                })
                .map(move |s| (day_number, s))
        })
    }

    /// True when a day still has at least one future step.
    pub fn day_has_future_steps(&self, day: &PlanDay, effective_from: Timestamp) -> bool {
        day.steps.iter().any(|s| {
            s.is_future() && step_anchor(self.start_date, day.day_number, s) >= effective_from
        })
    }
}
