//! Adaptation eligibility policy: state short-circuits, conflict
//! matrix, and per-category rate limits.
//!
//! Consulted before the adaptation engine runs. Every rejection carries
//! a stable, user-distinguishable reason string — never a generic
//! failure — because the UI and analytics both branch on it.

use jiff::tz::TimeZone;
use jiff::Timestamp;

use crate::adaptation::intent::{AdaptationCategory, AdaptationIntent};
use crate::error::{EngineError, Result};
use crate::models::{AdaptationRecord, Load, Plan, PlanStatus};

/// Rate limit knobs for one adaptation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Applied adaptations allowed within one UTC calendar day
    pub max_per_day: u32,
    /// Applied adaptations allowed over the plan's lifetime
    pub max_total: u32,
    /// Minimum minutes since the last applied adaptation in the category
    pub cooldown_minutes: i64,
}

/// Rate limits per category.
pub fn rate_limit(category: AdaptationCategory) -> RateLimit {
    match category {
        AdaptationCategory::LoadAdjustment => RateLimit {
            max_per_day: 2,
            max_total: 10,
            cooldown_minutes: 60,
        },
        AdaptationCategory::DifficultyAdjustment => RateLimit {
            max_per_day: 2,
            max_total: 10,
            cooldown_minutes: 60,
        },
        AdaptationCategory::DurationAdjustment => RateLimit {
            max_per_day: 1,
            max_total: 3,
            cooldown_minutes: 240,
        },
        AdaptationCategory::ExecutionState => RateLimit {
            max_per_day: 4,
            max_total: 30,
            cooldown_minutes: 15,
        },
        AdaptationCategory::FocusChange => RateLimit {
            max_per_day: 1,
            max_total: 2,
            cooldown_minutes: 1440,
        },
    }
}

/// Intents that may not have been the immediately preceding applied
/// adaptation. Structural intents conflict with themselves (no blind
/// repetition without something else in between); the two duration
/// changes additionally conflict with each other.
pub fn conflicts_with(intent: AdaptationIntent) -> &'static [AdaptationIntent] {
    use AdaptationIntent::*;
    match intent {
        ReduceDailyLoad => &[ReduceDailyLoad],
        IncreaseDailyLoad => &[IncreaseDailyLoad],
        LowerDifficulty => &[LowerDifficulty],
        IncreaseDifficulty => &[IncreaseDifficulty],
        ExtendPlanDuration => &[ExtendPlanDuration, ShortenPlanDuration],
        ShortenPlanDuration => &[ShortenPlanDuration, ExtendPlanDuration],
        PausePlan => &[],
        ResumePlan => &[],
        ChangeMainCategory => &[ChangeMainCategory],
    }
}

/// Runs the full eligibility check for an intent against the current
/// plan state and adaptation history.
///
/// Check order: state short-circuits, then the conflict matrix, then
/// rate limits. Rolled-back history entries never count.
pub fn check_eligibility(
    plan: &Plan,
    intent: AdaptationIntent,
    history: &[AdaptationRecord],
    now: Timestamp,
) -> Result<()> {
    check_plan_state(plan, intent)?;

    let applied: Vec<&AdaptationRecord> =
        history.iter().filter(|r| !r.is_rolled_back).collect();

    if let Some(last) = applied.last() {
        if conflicts_with(intent).contains(&last.intent) {
            return Err(EngineError::not_eligible(format!(
                "conflicts_with_previous_{}",
                last.intent
            )));
        }
    }

    let category = intent.category();
    let limit = rate_limit(category);
    let in_category: Vec<&&AdaptationRecord> = applied
        .iter()
        .filter(|r| r.category == category)
        .collect();

    let total = in_category.len() as u32;
    if total >= limit.max_total {
        return Err(EngineError::not_eligible(format!(
            "lifetime_limit_reached_{total}_of_{}",
            limit.max_total
        )));
    }

    let today = now.to_zoned(TimeZone::UTC).date();
    let today_count = in_category
        .iter()
        .filter(|r| r.applied_at.to_zoned(TimeZone::UTC).date() == today)
        .count() as u32;
    if today_count >= limit.max_per_day {
        return Err(EngineError::not_eligible(format!(
            "daily_limit_reached_{today_count}_of_{}",
            limit.max_per_day
        )));
    }

    if let Some(last) = in_category.last() {
        let elapsed_minutes = (now.as_second() - last.applied_at.as_second()) / 60;
        if elapsed_minutes < limit.cooldown_minutes {
            let remaining = limit.cooldown_minutes - elapsed_minutes;
            return Err(EngineError::not_eligible(format!(
                "cooldown_active_{remaining}m_remaining"
            )));
        }
    }

    Ok(())
}

/// State-specific short-circuits that need no history at all.
fn check_plan_state(plan: &Plan, intent: AdaptationIntent) -> Result<()> {
    use AdaptationIntent::*;

    match intent {
        PausePlan => {
            if plan.status == PlanStatus::Paused {
                return Err(EngineError::not_eligible("already_paused"));
            }
            if plan.status != PlanStatus::Active {
                return Err(EngineError::not_eligible("plan_not_active"));
            }
        }
        ResumePlan => {
            if plan.status != PlanStatus::Paused {
                return Err(EngineError::not_eligible("not_paused"));
            }
        }
        _ => {
            if !matches!(plan.status, PlanStatus::Active | PlanStatus::Paused) {
                return Err(EngineError::not_eligible("plan_not_active"));
            }
            match intent {
                ReduceDailyLoad if plan.load == Load::Lite => {
                    return Err(EngineError::not_eligible("already_at_minimum_load"));
                }
                IncreaseDailyLoad if plan.load == Load::Intensive => {
                    return Err(EngineError::not_eligible("already_at_maximum_load"));
                }
                _ => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Duration, Focus, TimeSlot};

    fn plan(load: Load, status: PlanStatus) -> Plan {
        Plan {
            id: 1,
            user_id: 42,
            status,
            duration: Duration::Standard,
            focus: Focus::Somatic,
            load,
            total_days: 21,
            current_day: 3,
            adaptation_version: 0,
            preferred_time_slots: vec![TimeSlot::Morning, TimeSlot::Evening],
            start_date: Timestamp::UNIX_EPOCH,
            end_date: None,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
            days: vec![],
        }
    }

    fn record(id: u64, intent: AdaptationIntent, applied_at: Timestamp) -> AdaptationRecord {
        AdaptationRecord {
            id,
            plan_id: 1,
            intent,
            category: intent.category(),
            applied_at,
            is_rolled_back: false,
        }
    }

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_reduce_blocked_at_minimum_load() {
        let err = check_eligibility(
            &plan(Load::Lite, PlanStatus::Active),
            AdaptationIntent::ReduceDailyLoad,
            &[],
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(err.eligibility_reason(), Some("already_at_minimum_load"));
    }

    #[test]
    fn test_increase_blocked_at_maximum_load() {
        let err = check_eligibility(
            &plan(Load::Intensive, PlanStatus::Active),
            AdaptationIntent::IncreaseDailyLoad,
            &[],
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(err.eligibility_reason(), Some("already_at_maximum_load"));
    }

    #[test]
    fn test_pause_blocked_when_already_paused() {
        let err = check_eligibility(
            &plan(Load::Mid, PlanStatus::Paused),
            AdaptationIntent::PausePlan,
            &[],
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(err.eligibility_reason(), Some("already_paused"));
    }

    #[test]
    fn test_resume_blocked_when_not_paused() {
        let err = check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ResumePlan,
            &[],
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(err.eligibility_reason(), Some("not_paused"));
    }

    #[test]
    fn test_conflict_with_immediately_preceding_intent() {
        let history = vec![record(
            1,
            AdaptationIntent::ReduceDailyLoad,
            ts("2026-02-27T10:00:00Z"),
        )];
        let err = check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ReduceDailyLoad,
            &history,
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(
            err.eligibility_reason(),
            Some("conflicts_with_previous_REDUCE_DAILY_LOAD")
        );
    }

    #[test]
    fn test_extend_conflicts_with_previous_shorten() {
        let history = vec![record(
            1,
            AdaptationIntent::ShortenPlanDuration,
            ts("2026-02-20T10:00:00Z"),
        )];
        let err = check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ExtendPlanDuration,
            &history,
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(
            err.eligibility_reason(),
            Some("conflicts_with_previous_SHORTEN_PLAN_DURATION")
        );
    }

    #[test]
    fn test_rolled_back_entries_do_not_conflict() {
        let mut rolled = record(
            1,
            AdaptationIntent::ReduceDailyLoad,
            ts("2026-02-27T10:00:00Z"),
        );
        rolled.is_rolled_back = true;
        assert!(check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ReduceDailyLoad,
            &[rolled],
            ts("2026-03-01T12:00:00Z"),
        )
        .is_ok());
    }

    #[test]
    fn test_daily_limit_third_load_adjustment_rejected() {
        // alternate reduce/increase so the conflict matrix stays quiet;
        // cooldown is 60m, so space the entries apart
        let history = vec![
            record(
                1,
                AdaptationIntent::ReduceDailyLoad,
                ts("2026-03-01T08:00:00Z"),
            ),
            record(
                2,
                AdaptationIntent::IncreaseDailyLoad,
                ts("2026-03-01T10:00:00Z"),
            ),
        ];
        let err = check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ReduceDailyLoad,
            &history,
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(
            err.eligibility_reason(),
            Some("daily_limit_reached_2_of_2")
        );
    }

    #[test]
    fn test_daily_limit_resets_next_day() {
        let history = vec![
            record(
                1,
                AdaptationIntent::ReduceDailyLoad,
                ts("2026-03-01T08:00:00Z"),
            ),
            record(
                2,
                AdaptationIntent::IncreaseDailyLoad,
                ts("2026-03-01T10:00:00Z"),
            ),
        ];
        assert!(check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ReduceDailyLoad,
            &history,
            ts("2026-03-02T12:00:00Z"),
        )
        .is_ok());
    }

    #[test]
    fn test_category_cooldown_blocks_back_to_back() {
        let history = vec![record(
            1,
            AdaptationIntent::IncreaseDailyLoad,
            ts("2026-03-01T11:30:00Z"),
        )];
        let err = check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ReduceDailyLoad,
            &history,
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(
            err.eligibility_reason(),
            Some("cooldown_active_30m_remaining")
        );
    }

    #[test]
    fn test_lifetime_limit() {
        // 2 focus changes is the lifetime cap; history spaced far apart
        let history = vec![
            record(
                1,
                AdaptationIntent::ChangeMainCategory,
                ts("2026-01-01T10:00:00Z"),
            ),
            record(
                2,
                AdaptationIntent::PausePlan,
                ts("2026-01-10T10:00:00Z"),
            ),
            record(
                3,
                AdaptationIntent::ChangeMainCategory,
                ts("2026-02-01T10:00:00Z"),
            ),
            record(
                4,
                AdaptationIntent::PausePlan,
                ts("2026-02-10T10:00:00Z"),
            ),
        ];
        let err = check_eligibility(
            &plan(Load::Mid, PlanStatus::Active),
            AdaptationIntent::ChangeMainCategory,
            &history,
            ts("2026-03-01T12:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(err.eligibility_reason(), Some("lifetime_limit_reached_2_of_2"));
    }
}
