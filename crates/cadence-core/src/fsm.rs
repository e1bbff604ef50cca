//! Finite-state gate for session flow.
//!
//! States are partitioned into two mutually exclusive tunnels —
//! PLAN_FLOW (data collection → confirmation → finalization) and
//! ADAPTATION_FLOW — plus the idle/active states around them. The gate
//! never jumps directly between tunnels; each tunnel is entered and
//! exited only through its whitelisted edges.
//!
//! [`can_transition`] is a pure predicate. The caller is responsible for
//! atomically persisting the new state when it returns `true` and for
//! logging the rejection otherwise (the engine facade does both).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// All session states known to the system, with their wire strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Fresh user, nothing composed yet
    IdleNew,
    /// Onboarding finished, no plan yet
    IdleOnboarded,
    /// Previous plan ran to completion
    IdleFinished,
    /// Previous plan was dropped mid-way
    IdleDropped,
    /// User aborted the planning tunnel
    IdlePlanAborted,
    /// PLAN_FLOW tunnel: collecting the three pillars
    PlanFlowDataCollection,
    /// PLAN_FLOW tunnel: draft shown, awaiting accept/reject
    PlanFlowConfirmationPending,
    /// PLAN_FLOW tunnel: persisting and activating the plan
    PlanFlowFinalization,
    /// ADAPTATION_FLOW tunnel (single state)
    AdaptationFlow,
    /// A plan is live and delivering
    Active,
    /// A plan is live but paused
    ActivePaused,
    /// Post-adaptation acknowledgement, resolves back to ACTIVE
    ActiveConfirmation,
    /// Post-adaptation acknowledgement, resolves back to ACTIVE_PAUSED
    ActivePausedConfirmation,
}

impl SessionState {
    /// States from which the planning tunnel may be entered.
    const PLAN_FLOW_ENTRYPOINTS: [SessionState; 6] = [
        SessionState::IdleNew,
        SessionState::IdleOnboarded,
        SessionState::IdleFinished,
        SessionState::IdleDropped,
        SessionState::IdlePlanAborted,
        SessionState::Active,
    ];

    /// True for states inside the PLAN_FLOW tunnel.
    pub fn in_plan_flow(self) -> bool {
        matches!(
            self,
            SessionState::PlanFlowDataCollection
                | SessionState::PlanFlowConfirmationPending
                | SessionState::PlanFlowFinalization
        )
    }

    /// True for states inside the ADAPTATION_FLOW tunnel.
    pub fn in_adaptation_flow(self) -> bool {
        matches!(self, SessionState::AdaptationFlow)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::IdleNew => "IDLE_NEW",
            SessionState::IdleOnboarded => "IDLE_ONBOARDED",
            SessionState::IdleFinished => "IDLE_FINISHED",
            SessionState::IdleDropped => "IDLE_DROPPED",
            SessionState::IdlePlanAborted => "IDLE_PLAN_ABORTED",
            SessionState::PlanFlowDataCollection => "PLAN_FLOW:DATA_COLLECTION",
            SessionState::PlanFlowConfirmationPending => "PLAN_FLOW:CONFIRMATION_PENDING",
            SessionState::PlanFlowFinalization => "PLAN_FLOW:FINALIZATION",
            SessionState::AdaptationFlow => "ADAPTATION_FLOW",
            SessionState::Active => "ACTIVE",
            SessionState::ActivePaused => "ACTIVE_PAUSED",
            SessionState::ActiveConfirmation => "ACTIVE_CONFIRMATION",
            SessionState::ActivePausedConfirmation => "ACTIVE_PAUSED_CONFIRMATION",
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IDLE_NEW" => Ok(SessionState::IdleNew),
            "IDLE_ONBOARDED" => Ok(SessionState::IdleOnboarded),
            "IDLE_FINISHED" => Ok(SessionState::IdleFinished),
            "IDLE_DROPPED" => Ok(SessionState::IdleDropped),
            "IDLE_PLAN_ABORTED" => Ok(SessionState::IdlePlanAborted),
            "PLAN_FLOW:DATA_COLLECTION" => Ok(SessionState::PlanFlowDataCollection),
            "PLAN_FLOW:CONFIRMATION_PENDING" => Ok(SessionState::PlanFlowConfirmationPending),
            "PLAN_FLOW:FINALIZATION" => Ok(SessionState::PlanFlowFinalization),
            "ADAPTATION_FLOW" => Ok(SessionState::AdaptationFlow),
            "ACTIVE" => Ok(SessionState::Active),
            "ACTIVE_PAUSED" => Ok(SessionState::ActivePaused),
            "ACTIVE_CONFIRMATION" => Ok(SessionState::ActiveConfirmation),
            "ACTIVE_PAUSED_CONFIRMATION" => Ok(SessionState::ActivePausedConfirmation),
            _ => Err(format!("Invalid session state: {s}")),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates whether a session transition is legal.
///
/// Invariants:
/// - no transition jumps directly between a PLAN_FLOW state and an
///   ADAPTATION_FLOW state, in either direction;
/// - PLAN_FLOW only moves forward through its own table, is entered only
///   from the whitelisted entrypoints, exits to ACTIVE only from
///   FINALIZATION, and may abort to IDLE_PLAN_ABORTED from any of its
///   states;
/// - ADAPTATION_FLOW is entered only from ACTIVE / ACTIVE_PAUSED and
///   exits only into the matching confirmation state, which itself only
///   resolves to ACTIVE / ACTIVE_PAUSED respectively.
pub fn can_transition(from: SessionState, to: SessionState) -> bool {
    use SessionState::*;

    // Tunnels are mutually exclusive; never cross directly.
    if from.in_plan_flow() && to.in_adaptation_flow() {
        return false;
    }
    if from.in_adaptation_flow() && to.in_plan_flow() {
        return false;
    }

    match (from, to) {
        // PLAN_FLOW forward movement
        (PlanFlowDataCollection, PlanFlowConfirmationPending) => true,
        (PlanFlowConfirmationPending, PlanFlowFinalization) => true,
        // PLAN_FLOW exit: the caller gates this on the plan actually
        // having been persisted.
        (PlanFlowFinalization, Active) => true,
        // Abort is allowed from anywhere inside the tunnel.
        (s, IdlePlanAborted) if s.in_plan_flow() => true,
        // Tunnel entry from whitelisted idle/active states only.
        (s, PlanFlowDataCollection) => SessionState::PLAN_FLOW_ENTRYPOINTS.contains(&s),
        // ADAPTATION_FLOW entry and exit.
        (Active | ActivePaused, AdaptationFlow) => true,
        (AdaptationFlow, ActiveConfirmation | ActivePausedConfirmation) => true,
        // Confirmation states resolve to their matching live state.
        (ActiveConfirmation, Active) => true,
        (ActivePausedConfirmation, ActivePaused) => true,
        // Pause toggling outside any tunnel.
        (Active, ActivePaused) | (ActivePaused, Active) => true,
        // Plan lifecycle endings.
        (Active, IdleFinished) | (Active, IdleDropped) => true,
        (ActivePaused, IdleDropped) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;
    use super::*;

    #[test]
    fn test_no_tunnel_crossing() {
        assert!(!can_transition(PlanFlowDataCollection, AdaptationFlow));
        assert!(!can_transition(PlanFlowConfirmationPending, AdaptationFlow));
        assert!(!can_transition(PlanFlowFinalization, AdaptationFlow));
        assert!(!can_transition(AdaptationFlow, PlanFlowDataCollection));
        assert!(!can_transition(AdaptationFlow, PlanFlowFinalization));
    }

    #[test]
    fn test_plan_flow_forward_edges() {
        assert!(can_transition(
            PlanFlowDataCollection,
            PlanFlowConfirmationPending
        ));
        assert!(can_transition(
            PlanFlowConfirmationPending,
            PlanFlowFinalization
        ));
        assert!(can_transition(PlanFlowFinalization, Active));
        // no skipping ahead
        assert!(!can_transition(PlanFlowDataCollection, PlanFlowFinalization));
        // no going backwards
        assert!(!can_transition(
            PlanFlowConfirmationPending,
            PlanFlowDataCollection
        ));
        // only FINALIZATION exits to ACTIVE
        assert!(!can_transition(PlanFlowConfirmationPending, Active));
    }

    #[test]
    fn test_plan_flow_entry_whitelist() {
        assert!(can_transition(Active, PlanFlowDataCollection));
        assert!(can_transition(IdleNew, PlanFlowDataCollection));
        assert!(can_transition(IdleOnboarded, PlanFlowDataCollection));
        assert!(can_transition(IdlePlanAborted, PlanFlowDataCollection));
        // paused users must resume (or abort) before replanning
        assert!(!can_transition(ActivePaused, PlanFlowDataCollection));
        assert!(!can_transition(AdaptationFlow, PlanFlowDataCollection));
        assert!(!can_transition(ActiveConfirmation, PlanFlowDataCollection));
    }

    #[test]
    fn test_any_plan_flow_state_may_abort() {
        for from in [
            PlanFlowDataCollection,
            PlanFlowConfirmationPending,
            PlanFlowFinalization,
        ] {
            assert!(can_transition(from, IdlePlanAborted), "{from}");
        }
        assert!(!can_transition(AdaptationFlow, IdlePlanAborted));
    }

    #[test]
    fn test_adaptation_flow_edges() {
        assert!(can_transition(Active, AdaptationFlow));
        assert!(can_transition(ActivePaused, AdaptationFlow));
        assert!(!can_transition(IdleOnboarded, AdaptationFlow));

        assert!(can_transition(AdaptationFlow, ActiveConfirmation));
        assert!(can_transition(AdaptationFlow, ActivePausedConfirmation));
        assert!(!can_transition(AdaptationFlow, Active));

        assert!(can_transition(ActiveConfirmation, Active));
        assert!(can_transition(ActivePausedConfirmation, ActivePaused));
        assert!(!can_transition(ActiveConfirmation, ActivePaused));
        assert!(!can_transition(ActivePausedConfirmation, Active));
    }

    #[test]
    fn test_wire_string_round_trip() {
        let states = [
            IdleNew,
            IdleOnboarded,
            IdleFinished,
            IdleDropped,
            IdlePlanAborted,
            PlanFlowDataCollection,
            PlanFlowConfirmationPending,
            PlanFlowFinalization,
            AdaptationFlow,
            Active,
            ActivePaused,
            ActiveConfirmation,
            ActivePausedConfirmation,
        ];
        for state in states {
            assert_eq!(state.as_str().parse::<SessionState>().unwrap(), state);
        }
        assert_eq!(
            "PLAN_FLOW:DATA_COLLECTION".parse::<SessionState>().unwrap(),
            PlanFlowDataCollection
        );
        assert!("PLAN_FLOW:UNKNOWN".parse::<SessionState>().is_err());
    }
}
