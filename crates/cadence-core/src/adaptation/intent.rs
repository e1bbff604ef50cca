//! Adaptation intent domain model.
//!
//! Single source of truth for all adaptation types: every derived
//! property (category, structure impact, reversibility) comes from the
//! one metadata match below. Reversibility is computed from the inverse
//! table, never stored as a separate flag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// All supported adaptation intents. The wire strings are shared with
/// version logs, history rows, and telemetry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdaptationIntent {
    ReduceDailyLoad,
    IncreaseDailyLoad,
    LowerDifficulty,
    IncreaseDifficulty,
    ExtendPlanDuration,
    ShortenPlanDuration,
    PausePlan,
    ResumePlan,
    ChangeMainCategory,
}

/// Grouping used by rate limiting and analytics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdaptationCategory {
    LoadAdjustment,
    DifficultyAdjustment,
    DurationAdjustment,
    ExecutionState,
    FocusChange,
}

/// Static metadata for one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentMeta {
    /// Intent needs explicit parameters (target duration, new focus, ...)
    pub requires_params: bool,
    pub category: AdaptationCategory,
    /// Intent changes plan structure (steps/days), not just execution state
    pub affects_structure: bool,
    /// The intent that undoes this one, applied as a *new* adaptation.
    /// `None` marks the intent as irreversible by design.
    pub inverse: Option<AdaptationIntent>,
}

impl AdaptationIntent {
    pub const ALL: [AdaptationIntent; 9] = [
        AdaptationIntent::ReduceDailyLoad,
        AdaptationIntent::IncreaseDailyLoad,
        AdaptationIntent::LowerDifficulty,
        AdaptationIntent::IncreaseDifficulty,
        AdaptationIntent::ExtendPlanDuration,
        AdaptationIntent::ShortenPlanDuration,
        AdaptationIntent::PausePlan,
        AdaptationIntent::ResumePlan,
        AdaptationIntent::ChangeMainCategory,
    ];

    /// The metadata table. Duration and focus changes carry no inverse:
    /// a focus change spawns a brand-new plan and pauses the old one,
    /// and duration changes make pre-adaptation step history ambiguous
    /// to restore.
    pub fn meta(self) -> IntentMeta {
        use AdaptationCategory::*;
        use AdaptationIntent::*;
        match self {
            ReduceDailyLoad => IntentMeta {
                requires_params: true,
                category: LoadAdjustment,
                affects_structure: true,
                inverse: Some(IncreaseDailyLoad),
            },
            IncreaseDailyLoad => IntentMeta {
                requires_params: false,
                category: LoadAdjustment,
                affects_structure: true,
                inverse: Some(ReduceDailyLoad),
            },
            LowerDifficulty => IntentMeta {
                requires_params: false,
                category: DifficultyAdjustment,
                affects_structure: true,
                inverse: Some(IncreaseDifficulty),
            },
            IncreaseDifficulty => IntentMeta {
                requires_params: false,
                category: DifficultyAdjustment,
                affects_structure: true,
                inverse: Some(LowerDifficulty),
            },
            ExtendPlanDuration => IntentMeta {
                requires_params: true,
                category: DurationAdjustment,
                affects_structure: true,
                inverse: None,
            },
            ShortenPlanDuration => IntentMeta {
                requires_params: true,
                category: DurationAdjustment,
                affects_structure: true,
                inverse: None,
            },
            PausePlan => IntentMeta {
                requires_params: false,
                category: ExecutionState,
                affects_structure: false,
                inverse: Some(ResumePlan),
            },
            ResumePlan => IntentMeta {
                requires_params: false,
                category: ExecutionState,
                affects_structure: false,
                inverse: Some(PausePlan),
            },
            ChangeMainCategory => IntentMeta {
                requires_params: true,
                category: FocusChange,
                affects_structure: true,
                inverse: None,
            },
        }
    }

    pub fn category(self) -> AdaptationCategory {
        self.meta().category
    }

    pub fn is_structural(self) -> bool {
        self.meta().affects_structure
    }

    /// The intent that undoes this one, used for UX "undo" framing.
    pub fn inverse(self) -> Option<AdaptationIntent> {
        self.meta().inverse
    }

    /// Derived from the inverse table — an intent is reversible iff it
    /// has an inverse.
    pub fn is_reversible(self) -> bool {
        self.inverse().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdaptationIntent::ReduceDailyLoad => "REDUCE_DAILY_LOAD",
            AdaptationIntent::IncreaseDailyLoad => "INCREASE_DAILY_LOAD",
            AdaptationIntent::LowerDifficulty => "LOWER_DIFFICULTY",
            AdaptationIntent::IncreaseDifficulty => "INCREASE_DIFFICULTY",
            AdaptationIntent::ExtendPlanDuration => "EXTEND_PLAN_DURATION",
            AdaptationIntent::ShortenPlanDuration => "SHORTEN_PLAN_DURATION",
            AdaptationIntent::PausePlan => "PAUSE_PLAN",
            AdaptationIntent::ResumePlan => "RESUME_PLAN",
            AdaptationIntent::ChangeMainCategory => "CHANGE_MAIN_CATEGORY",
        }
    }
}

impl FromStr for AdaptationIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdaptationIntent::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid adaptation intent: {s}"))
    }
}

impl fmt::Display for AdaptationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AdaptationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AdaptationCategory::LoadAdjustment => "LOAD_ADJUSTMENT",
            AdaptationCategory::DifficultyAdjustment => "DIFFICULTY_ADJUSTMENT",
            AdaptationCategory::DurationAdjustment => "DURATION_ADJUSTMENT",
            AdaptationCategory::ExecutionState => "EXECUTION_STATE",
            AdaptationCategory::FocusChange => "FOCUS_CHANGE",
        }
    }
}

impl FromStr for AdaptationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOAD_ADJUSTMENT" => Ok(AdaptationCategory::LoadAdjustment),
            "DIFFICULTY_ADJUSTMENT" => Ok(AdaptationCategory::DifficultyAdjustment),
            "DURATION_ADJUSTMENT" => Ok(AdaptationCategory::DurationAdjustment),
            "EXECUTION_STATE" => Ok(AdaptationCategory::ExecutionState),
            "FOCUS_CHANGE" => Ok(AdaptationCategory::FocusChange),
            _ => Err(format!("Invalid adaptation category: {s}")),
        }
    }
}

impl fmt::Display for AdaptationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
