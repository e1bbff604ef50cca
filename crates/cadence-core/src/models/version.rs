//! Append-only audit records for plan adaptations.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::adaptation::{AdaptationCategory, AdaptationIntent};

/// One row of the append-only version log: what changed on a plan and
/// when. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanVersion {
    pub id: u64,
    pub plan_id: u64,

    /// The adaptation intent that produced this version
    pub adaptation_type: AdaptationIntent,

    /// Structured diff payload: affected step ids and before/after state
    pub diff: serde_json::Value,

    pub created_at: Timestamp,
}

/// One applied adaptation, as seen by the rate limiter and the conflict
/// matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdaptationRecord {
    pub id: u64,
    pub plan_id: u64,
    pub intent: AdaptationIntent,
    pub category: AdaptationCategory,
    pub applied_at: Timestamp,

    /// Rolled-back records no longer count toward limits or conflicts
    pub is_rolled_back: bool,
}
