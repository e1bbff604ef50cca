//! Status enumeration for live plans.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type-safe enumeration of live plan statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Plan is running and steps are being delivered
    #[default]
    Active,

    /// Plan execution is suspended; steps stay but are unscheduled
    Paused,

    /// Plan was replaced or given up before completion
    Abandoned,

    /// Plan ran through its full day range
    Completed,
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PlanStatus::Active),
            "paused" => Ok(PlanStatus::Paused),
            "abandoned" => Ok(PlanStatus::Abandoned),
            "completed" => Ok(PlanStatus::Completed),
            _ => Err(format!("Invalid plan status: {s}")),
        }
    }
}

impl PlanStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Paused => "paused",
            PlanStatus::Abandoned => "abandoned",
            PlanStatus::Completed => "completed",
        }
    }
}
