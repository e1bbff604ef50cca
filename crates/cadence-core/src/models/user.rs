//! User model definition.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::fsm::SessionState;
use crate::schedule::SlotTimes;

/// A user as the engine sees them: timezone, session state, and
/// slot-time overrides. Everything else about users lives outside this
/// core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,

    /// IANA timezone name; unknown values degrade to UTC at resolution
    /// time
    pub timezone: String,

    pub current_state: SessionState,

    /// Raw `HH:MM` overrides per time slot, if the user customized them
    pub slot_times: Option<BTreeMap<String, String>>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The user's effective slot times: their overrides when present and
    /// parseable, the fixed defaults otherwise.
    pub fn effective_slot_times(&self) -> SlotTimes {
        self.slot_times
            .as_ref()
            .and_then(|raw| SlotTimes::from_strings(raw).ok())
            .unwrap_or_default()
    }
}
