//! Parameter structures for engine operations.
//!
//! Shared by every interface (CLI today, other transports later)
//! without framework-specific derives; interfaces add their own wrapper
//! types and convert into these. JSON schema generation is available
//! behind the `schema` feature.

use std::collections::BTreeMap;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{Duration, Focus, Load, TimeSlot};

/// Generic parameters for operations requiring just an ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Id {
    /// The ID of the resource to operate on
    pub id: u64,
}

/// Parameters for composing a new draft.
///
/// The three pillars are optional here so that an incomplete request
/// surfaces as a recoverable `ThreePillarsMissing` validation error
/// naming the missing ones, rather than failing to parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ComposeDraft {
    pub user_id: u64,
    pub duration: Option<Duration>,
    pub focus: Option<Focus>,
    pub load: Option<Load>,
    /// Must match the load's slots-per-day contract
    #[serde(default)]
    pub preferred_time_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub forbidden_categories: Vec<String>,
    #[serde(default)]
    pub forbidden_impact_areas: Vec<String>,
}

/// Parameters for registering or updating a user's timezone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SetTimezone {
    pub user_id: u64,
    /// IANA timezone name (e.g. `Europe/Kyiv`)
    pub timezone: String,
}

/// Parameters for replacing a user's daily slot-time map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SetSlotTimes {
    pub user_id: u64,
    /// Full `MORNING`/`DAY`/`EVENING` → `HH:MM` map
    pub slot_times: BTreeMap<String, String>,
}
