//! End-to-end tests for the engine facade: compose, activate, adapt,
//! and the audit trail, against a real temp database.

mod common;

use cadence_core::adaptation::AdaptationRequest;
use cadence_core::models::{Duration, Focus, Load, PlanStatus, TimeSlot};
use cadence_core::params::ComposeDraft;
use cadence_core::{EngineError, SessionState};
use common::create_test_engine;
use jiff::Timestamp;

fn ts(s: &str) -> Timestamp {
    s.parse().unwrap()
}

fn compose_params(user_id: u64, duration: Duration, load: Load) -> ComposeDraft {
    let preferred_time_slots = match load {
        Load::Lite => vec![TimeSlot::Morning],
        Load::Mid => vec![TimeSlot::Morning, TimeSlot::Evening],
        Load::Intensive => vec![TimeSlot::Morning, TimeSlot::Day, TimeSlot::Evening],
    };
    ComposeDraft {
        user_id,
        duration: Some(duration),
        focus: Some(Focus::Somatic),
        load: Some(load),
        preferred_time_slots,
        ..Default::default()
    }
}

/// 05:00 UTC = 08:00 in Kyiv (EEST): every slot of the day is still
/// ahead, so the anchor stays on the activation date.
const EARLY_ACTIVATION: &str = "2026-06-15T05:00:00Z";

#[tokio::test]
async fn test_full_compose_activate_workflow() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(42, "Europe/Kyiv").await.unwrap();
    let draft = engine
        .compose_draft(&compose_params(42, Duration::Medium, Load::Mid))
        .await
        .unwrap();
    assert!(draft.is_valid());
    assert_eq!(draft.total_steps(), 28);

    // the draft is stored as the single pending draft
    let stored = engine.get_draft(42).await.unwrap().unwrap();
    assert_eq!(stored.id, draft.id);

    let activated = engine
        .activate_plan_at(42, ts(EARLY_ACTIVATION))
        .await
        .unwrap();
    assert_eq!(activated.plan.status, PlanStatus::Active);
    assert_eq!(activated.plan.total_days, 14);
    assert_eq!(activated.plan.days.len(), 14);
    assert_eq!(activated.schedule_requests.len(), 28);
    assert!(activated
        .plan
        .days
        .iter()
        .flat_map(|d| d.steps.iter())
        .all(|s| s.scheduled_for.is_some()));

    // draft consumed, user moved to ACTIVE
    assert!(engine.get_draft(42).await.unwrap().is_none());
    let user = engine.get_user(42).await.unwrap().unwrap();
    assert_eq!(user.current_state, SessionState::Active);

    // activating again without a draft fails cleanly
    let err = engine
        .activate_plan_at(42, ts(EARLY_ACTIVATION))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DraftNotFound { user_id: 42 }));
}

#[tokio::test]
async fn test_second_active_plan_is_rejected() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(7, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(7, Duration::Short, Load::Lite))
        .await
        .unwrap();
    engine
        .activate_plan_at(7, ts(EARLY_ACTIVATION))
        .await
        .unwrap();

    engine
        .compose_draft(&compose_params(7, Duration::Short, Load::Lite))
        .await
        .unwrap();
    let err = engine
        .activate_plan_at(7, ts(EARLY_ACTIVATION))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ActivePlanExists { user_id: 7, .. }));
}

#[tokio::test]
async fn test_composing_again_replaces_the_pending_draft() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(9, "UTC").await.unwrap();
    let first = engine
        .compose_draft(&compose_params(9, Duration::Short, Load::Lite))
        .await
        .unwrap();
    let second = engine
        .compose_draft(&compose_params(9, Duration::Standard, Load::Mid))
        .await
        .unwrap();

    let stored = engine.get_draft(9).await.unwrap().unwrap();
    assert_eq!(stored.id, second.id);
    assert_ne!(stored.id, first.id);
    assert_eq!(stored.duration, Duration::Standard);
}

#[tokio::test]
async fn test_late_activation_anchors_tomorrow() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(11, "Europe/Kyiv").await.unwrap();
    engine
        .compose_draft(&compose_params(11, Duration::Short, Load::Mid))
        .await
        .unwrap();

    // 19:00 UTC = 22:00 Kyiv: both the 09:30 and the 21:00 slot have
    // passed, so day 1 becomes tomorrow.
    let activated = engine
        .activate_plan_at(11, ts("2026-06-15T19:00:00Z"))
        .await
        .unwrap();

    let tz = jiff::tz::TimeZone::get("Europe/Kyiv").unwrap();
    let start_local = activated.plan.start_date.to_zoned(tz);
    assert_eq!(start_local.date(), jiff::civil::date(2026, 6, 16));
}

#[tokio::test]
async fn test_morning_activation_anchors_today() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(12, "Europe/Kyiv").await.unwrap();
    // evening-only plan: at 10:00 local the 21:00 slot is still ahead
    let params = ComposeDraft {
        preferred_time_slots: vec![TimeSlot::Evening],
        ..compose_params(12, Duration::Short, Load::Lite)
    };
    engine.compose_draft(&params).await.unwrap();

    let activated = engine
        .activate_plan_at(12, ts("2026-06-15T07:00:00Z"))
        .await
        .unwrap();

    let tz = jiff::tz::TimeZone::get("Europe/Kyiv").unwrap();
    let start_local = activated.plan.start_date.to_zoned(tz);
    assert_eq!(start_local.date(), jiff::civil::date(2026, 6, 15));
}

#[tokio::test]
async fn test_reduce_load_scenario() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(21, "Europe/Kyiv").await.unwrap();
    engine
        .compose_draft(&compose_params(21, Duration::Medium, Load::Mid))
        .await
        .unwrap();
    engine
        .activate_plan_at(21, ts(EARLY_ACTIVATION))
        .await
        .unwrap();

    // an hour after activation, still before the first delivery
    let applied = engine
        .adapt_at(
            21,
            AdaptationRequest::ReduceLoad {
                slot_to_remove: TimeSlot::Morning,
            },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();

    assert_eq!(applied.plan.load, Load::Lite);
    assert_eq!(applied.plan.preferred_time_slots, vec![TimeSlot::Evening]);
    assert_eq!(applied.plan.adaptation_version, 1);
    // all 14 morning steps were still pending
    assert_eq!(applied.outcome.canceled_step_ids.len(), 14);

    for day in &applied.plan.days {
        for step in &day.steps {
            if step.time_slot == TimeSlot::Morning {
                assert!(step.canceled_by_adaptation);
                assert_eq!(step.scheduled_for, None);
            } else {
                assert!(!step.canceled_by_adaptation);
            }
        }
    }

    // exactly one version row with the diff payload
    let versions = engine.plan_versions(applied.plan.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].diff["slot_removed"], "MORNING");
    assert_eq!(versions[0].diff["new_load"], "LITE");
    assert_eq!(
        versions[0].diff["canceled_step_ids"]
            .as_array()
            .unwrap()
            .len(),
        14
    );
}

#[tokio::test]
async fn test_reduce_then_increase_round_trip() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(22, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(22, Duration::Short, Load::Mid))
        .await
        .unwrap();
    engine
        .activate_plan_at(22, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();

    engine
        .adapt_at(
            22,
            AdaptationRequest::ReduceLoad {
                slot_to_remove: TimeSlot::Morning,
            },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();

    // past the 60-minute load-adjustment cooldown
    let applied = engine
        .adapt_at(
            22,
            AdaptationRequest::IncreaseLoad {
                slot_to_add: Some(TimeSlot::Morning),
            },
            ts("2026-06-15T08:00:00Z"),
        )
        .await
        .unwrap();

    assert_eq!(applied.plan.load, Load::Mid);
    assert_eq!(
        applied.plan.preferred_time_slots,
        vec![TimeSlot::Morning, TimeSlot::Evening]
    );
    assert!(!applied.outcome.added_step_ids.is_empty());
    // new steps were persisted with real ids and schedules
    for id in &applied.outcome.added_step_ids {
        let step = applied
            .plan
            .days
            .iter()
            .flat_map(|d| d.steps.iter())
            .find(|s| s.id == *id)
            .expect("added step present in reloaded plan");
        assert!(step.scheduled_for.is_some());
    }
}

#[tokio::test]
async fn test_third_load_adjustment_hits_daily_limit() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(23, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(23, Duration::Medium, Load::Intensive))
        .await
        .unwrap();
    engine
        .activate_plan_at(23, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();

    engine
        .adapt_at(
            23,
            AdaptationRequest::ReduceLoad {
                slot_to_remove: TimeSlot::Day,
            },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();
    engine
        .adapt_at(
            23,
            AdaptationRequest::IncreaseLoad { slot_to_add: None },
            ts("2026-06-15T08:00:00Z"),
        )
        .await
        .unwrap();

    let err = engine
        .adapt_at(
            23,
            AdaptationRequest::ReduceLoad {
                slot_to_remove: TimeSlot::Day,
            },
            ts("2026-06-15T10:00:00Z"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.eligibility_reason(), Some("daily_limit_reached_2_of_2"));
}

#[tokio::test]
async fn test_repeated_reduce_conflicts() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(24, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(24, Duration::Medium, Load::Intensive))
        .await
        .unwrap();
    engine
        .activate_plan_at(24, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();

    engine
        .adapt_at(
            24,
            AdaptationRequest::ReduceLoad {
                slot_to_remove: TimeSlot::Day,
            },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();

    // well past the cooldown, but reduce directly after reduce is a
    // conflict regardless of timing
    let err = engine
        .adapt_at(
            24,
            AdaptationRequest::ReduceLoad {
                slot_to_remove: TimeSlot::Morning,
            },
            ts("2026-06-15T09:00:00Z"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.eligibility_reason(),
        Some("conflicts_with_previous_REDUCE_DAILY_LOAD")
    );
}

#[tokio::test]
async fn test_pause_and_resume() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(25, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(25, Duration::Short, Load::Lite))
        .await
        .unwrap();
    engine
        .activate_plan_at(25, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();

    let paused = engine
        .adapt_at(25, AdaptationRequest::Pause, ts("2026-06-15T06:00:00Z"))
        .await
        .unwrap();
    assert_eq!(paused.plan.status, PlanStatus::Paused);
    assert!(paused
        .plan
        .days
        .iter()
        .flat_map(|d| d.steps.iter())
        .all(|s| s.scheduled_for.is_none()));
    let user = engine.get_user(25).await.unwrap().unwrap();
    assert_eq!(user.current_state, SessionState::ActivePaused);

    // pausing again is blocked with a distinct reason
    let err = engine
        .adapt_at(25, AdaptationRequest::Pause, ts("2026-06-15T06:30:00Z"))
        .await
        .unwrap_err();
    assert_eq!(err.eligibility_reason(), Some("already_paused"));

    let resumed = engine
        .adapt_at(25, AdaptationRequest::Resume, ts("2026-06-15T07:00:00Z"))
        .await
        .unwrap();
    assert_eq!(resumed.plan.status, PlanStatus::Active);
    assert!(!resumed.outcome.rescheduled_step_ids.is_empty());
    assert!(!resumed.schedule_requests.is_empty());
    let user = engine.get_user(25).await.unwrap().unwrap();
    assert_eq!(user.current_state, SessionState::Active);
}

#[tokio::test]
async fn test_shorten_duration() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(26, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(26, Duration::Standard, Load::Lite))
        .await
        .unwrap();
    engine
        .activate_plan_at(26, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();

    let applied = engine
        .adapt_at(
            26,
            AdaptationRequest::ShortenDuration { target_days: 14 },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();

    assert_eq!(applied.plan.total_days, 14);
    assert_eq!(applied.plan.duration, Duration::Medium);
    // 7 daily steps beyond day 14 were cancelled
    assert_eq!(applied.outcome.canceled_step_ids.len(), 7);
    for day in &applied.plan.days {
        for step in &day.steps {
            assert_eq!(step.canceled_by_adaptation, day.day_number > 14);
        }
    }
    let versions = engine.plan_versions(applied.plan.id).await.unwrap();
    assert_eq!(versions[0].diff["old_total_days"], 21);
    assert_eq!(versions[0].diff["new_total_days"], 14);
}

#[tokio::test]
async fn test_extend_duration_splices_new_days() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(27, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(27, Duration::Medium, Load::Lite))
        .await
        .unwrap();
    let activated = engine
        .activate_plan_at(27, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();
    let old_end = activated.plan.end_date.unwrap();

    let applied = engine
        .adapt_at(
            27,
            AdaptationRequest::ExtendDuration { target_days: 21 },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();

    assert_eq!(applied.plan.total_days, 21);
    assert_eq!(applied.plan.days.len(), 21);
    assert_eq!(applied.outcome.added_step_ids.len(), 7);
    assert!(applied.plan.end_date.unwrap() > old_end);
    // the new days are scheduled
    for day in applied.plan.days.iter().filter(|d| d.day_number > 14) {
        for step in &day.steps {
            assert!(step.scheduled_for.is_some());
        }
    }
    // existing days kept their steps untouched
    assert_eq!(
        applied
            .plan
            .days
            .iter()
            .filter(|d| d.day_number <= 14)
            .flat_map(|d| d.steps.iter())
            .filter(|s| s.canceled_by_adaptation)
            .count(),
        0
    );
}

#[tokio::test]
async fn test_shorten_rejects_non_canonical_target() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(28, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(28, Duration::Standard, Load::Lite))
        .await
        .unwrap();
    engine
        .activate_plan_at(28, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();

    let err = engine
        .adapt_at(
            28,
            AdaptationRequest::ShortenDuration { target_days: 10 },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDuration { value: 10 }));
}

#[tokio::test]
async fn test_change_focus_spawns_new_plan() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(29, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(29, Duration::Short, Load::Lite))
        .await
        .unwrap();
    let activated = engine
        .activate_plan_at(29, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();
    let old_plan_id = activated.plan.id;

    let applied = engine
        .adapt_at(
            29,
            AdaptationRequest::ChangeFocus {
                new_focus: Focus::Rest,
            },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();

    // old plan paused, new plan active with the new focus but the same
    // duration and load
    assert_eq!(applied.plan.id, old_plan_id);
    assert_eq!(applied.plan.status, PlanStatus::Paused);
    let new_plan = applied.new_plan.expect("replacement plan");
    assert_eq!(new_plan.status, PlanStatus::Active);
    assert_eq!(new_plan.focus, Focus::Rest);
    assert_eq!(new_plan.duration, Duration::Short);
    assert_eq!(new_plan.load, Load::Lite);

    // the version row on the old plan cross-references the new plan
    let versions = engine.plan_versions(old_plan_id).await.unwrap();
    assert_eq!(versions[0].diff["new_plan_id"], new_plan.id);

    // the new plan is now the user's current plan
    let current = engine.current_plan(29).await.unwrap().unwrap();
    assert_eq!(current.id, new_plan.id);
}

#[tokio::test]
async fn test_terminal_steps_survive_adaptation() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(30, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(30, Duration::Short, Load::Mid))
        .await
        .unwrap();
    let activated = engine
        .activate_plan_at(30, ts("2026-06-15T05:00:00Z"))
        .await
        .unwrap();

    // complete the first morning step
    let first_morning = activated
        .plan
        .days
        .iter()
        .flat_map(|d| d.steps.iter())
        .find(|s| s.time_slot == TimeSlot::Morning)
        .unwrap();
    let completed = engine.complete_step(first_morning.id).await.unwrap();
    assert!(completed.is_completed);
    assert!(completed.completed_at.is_some());

    let applied = engine
        .adapt_at(
            30,
            AdaptationRequest::ReduceLoad {
                slot_to_remove: TimeSlot::Morning,
            },
            ts("2026-06-15T06:00:00Z"),
        )
        .await
        .unwrap();

    assert!(!applied.outcome.canceled_step_ids.contains(&completed.id));
    let reloaded = applied
        .plan
        .days
        .iter()
        .flat_map(|d| d.steps.iter())
        .find(|s| s.id == completed.id)
        .unwrap();
    assert!(reloaded.is_completed);
    assert!(!reloaded.canceled_by_adaptation);

    // terminal steps reject further execution changes
    let err = engine.complete_step(completed.id).await.unwrap_err();
    assert_eq!(err.eligibility_reason(), Some("step_already_completed"));
    let err = engine.skip_step(completed.id).await.unwrap_err();
    assert_eq!(err.eligibility_reason(), Some("step_already_completed"));
}

#[tokio::test]
async fn test_state_transitions_are_gated() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(31, "UTC").await.unwrap();

    // IDLE_NEW is a whitelisted planning entrypoint
    let user = engine
        .transition_state(31, SessionState::PlanFlowDataCollection)
        .await
        .unwrap();
    assert_eq!(user.current_state, SessionState::PlanFlowDataCollection);

    // tunnel crossing is rejected and the state stays put
    let err = engine
        .transition_state(31, SessionState::AdaptationFlow)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalTransition { .. }));
    let user = engine.get_user(31).await.unwrap().unwrap();
    assert_eq!(user.current_state, SessionState::PlanFlowDataCollection);

    // forward through the tunnel and abort back out
    engine
        .transition_state(31, SessionState::PlanFlowConfirmationPending)
        .await
        .unwrap();
    let user = engine
        .transition_state(31, SessionState::IdlePlanAborted)
        .await
        .unwrap();
    assert_eq!(user.current_state, SessionState::IdlePlanAborted);
}

#[tokio::test]
async fn test_slot_time_update_reschedules_future_steps() {
    let (_temp_dir, engine) = create_test_engine().await;

    engine.ensure_user(32, "UTC").await.unwrap();
    engine
        .compose_draft(&compose_params(32, Duration::Short, Load::Lite))
        .await
        .unwrap();
    // anchored far in the future: slot-time updates recompute against
    // the real clock, and only pending deliveries are touched
    let activated = engine
        .activate_plan_at(32, ts("2030-06-15T05:00:00Z"))
        .await
        .unwrap();
    let before: Vec<_> = activated
        .plan
        .days
        .iter()
        .flat_map(|d| d.steps.iter())
        .map(|s| s.scheduled_for.unwrap())
        .collect();

    let mut slot_times = std::collections::BTreeMap::new();
    slot_times.insert("MORNING".to_string(), "07:15".to_string());
    slot_times.insert("DAY".to_string(), "13:00".to_string());
    slot_times.insert("EVENING".to_string(), "20:00".to_string());
    let requests = engine
        .set_slot_times(&cadence_core::params::SetSlotTimes {
            user_id: 32,
            slot_times,
        })
        .await
        .unwrap();
    assert!(!requests.is_empty());

    let plan = engine.current_plan(32).await.unwrap().unwrap();
    let after: Vec<_> = plan
        .days
        .iter()
        .flat_map(|d| d.steps.iter())
        .filter(|s| s.scheduled_for.is_some())
        .map(|s| s.scheduled_for.unwrap())
        .collect();
    assert!(!after.is_empty());
    assert_ne!(before, after);
    // rescheduled instants land on the new 07:15 wall clock
    for instant in &after {
        let local = instant.to_zoned(jiff::tz::TimeZone::UTC);
        assert_eq!((local.hour(), local.minute()), (7, 15));
    }
}
