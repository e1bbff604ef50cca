//! The three composition pillars and their metadata tables.
//!
//! Every derived property (day counts, slot structures, time-slot
//! preferences, intensity curves) is computed from the single metadata
//! match on the enum — nothing is duplicated as separate flags, so the
//! tables cannot drift apart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Plan duration. Each variant maps to a canonical day count; any other
/// day count is rejected before composition begins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Duration {
    /// 7 days — sprint, rapid stabilization
    Short,
    /// 14 days
    Medium,
    /// 21 days — stable rhythm with progression
    Standard,
    /// 90 days — wave-like pacing
    Long,
}

/// Difficulty pacing shape over the weeks of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntensityCurve {
    /// Constant difficulty (1 in week one, 2 afterwards)
    Flat,
    /// Ramp 1 → 2 → 3 by week
    Progressive,
    /// Repeating 5-week cycle: 1, 2, 2, 3, 1
    Wave,
}

impl Duration {
    pub const ALL: [Duration; 4] = [
        Duration::Short,
        Duration::Medium,
        Duration::Standard,
        Duration::Long,
    ];

    /// Canonical number of days for this duration.
    pub fn total_days(self) -> u32 {
        match self {
            Duration::Short => 7,
            Duration::Medium => 14,
            Duration::Standard => 21,
            Duration::Long => 90,
        }
    }

    /// Maps a canonical day count back to its duration.
    pub fn from_days(days: u32) -> Option<Duration> {
        Duration::ALL.into_iter().find(|d| d.total_days() == days)
    }

    pub fn intensity_curve(self) -> IntensityCurve {
        match self {
            Duration::Short => IntensityCurve::Flat,
            Duration::Medium | Duration::Standard => IntensityCurve::Progressive,
            Duration::Long => IntensityCurve::Wave,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Duration::Short => "SHORT",
            Duration::Medium => "MEDIUM",
            Duration::Standard => "STANDARD",
            Duration::Long => "LONG",
        }
    }
}

impl FromStr for Duration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SHORT" => Ok(Duration::Short),
            "MEDIUM" => Ok(Duration::Medium),
            "STANDARD" => Ok(Duration::Standard),
            "LONG" => Ok(Duration::Long),
            _ => Err(format!("Invalid duration: {s}")),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Focus category. Matches the content library's category tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Somatic,
    Cognitive,
    Boundaries,
    Rest,
    Mixed,
}

impl Focus {
    pub const ALL: [Focus; 5] = [
        Focus::Somatic,
        Focus::Cognitive,
        Focus::Boundaries,
        Focus::Rest,
        Focus::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Focus::Somatic => "somatic",
            Focus::Cognitive => "cognitive",
            Focus::Boundaries => "boundaries",
            Focus::Rest => "rest",
            Focus::Mixed => "mixed",
        }
    }
}

impl FromStr for Focus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "somatic" => Ok(Focus::Somatic),
            "cognitive" => Ok(Focus::Cognitive),
            "boundaries" => Ok(Focus::Boundaries),
            "rest" => Ok(Focus::Rest),
            "mixed" => Ok(Focus::Mixed),
            _ => Err(format!("Invalid focus: {s}")),
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily task load. Fixes both the number of steps per day and the
/// slot-type structure of each day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Load {
    /// 1 step per day
    Lite,
    /// 2 steps per day
    Mid,
    /// 3 steps per day
    Intensive,
}

impl Load {
    /// Number of steps each day must carry under this load.
    pub fn slots_per_day(self) -> usize {
        self.slot_structure().len()
    }

    /// The ordered slot-type structure of one day.
    pub fn slot_structure(self) -> &'static [SlotType] {
        match self {
            Load::Lite => &[SlotType::Core],
            Load::Mid => &[SlotType::Core, SlotType::Support],
            Load::Intensive => &[SlotType::Core, SlotType::Support, SlotType::Rest],
        }
    }

    /// Maps a slot count back to a load; used when adaptations add or
    /// remove a daily slot.
    pub fn from_slot_count(count: usize) -> Option<Load> {
        match count {
            1 => Some(Load::Lite),
            2 => Some(Load::Mid),
            3 => Some(Load::Intensive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Load::Lite => "LITE",
            Load::Mid => "MID",
            Load::Intensive => "INTENSIVE",
        }
    }
}

impl FromStr for Load {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LITE" => Ok(Load::Lite),
            "MID" => Ok(Load::Mid),
            "INTENSIVE" => Ok(Load::Intensive),
            _ => Err(format!("Invalid load: {s}")),
        }
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step's functional role within its day, mirroring the content
/// library's priority tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum SlotType {
    Core,
    Support,
    Emergency,
    Rest,
}

impl SlotType {
    /// Preferred time-of-day slots for this slot type, in order.
    pub fn time_preferences(self) -> &'static [TimeSlot] {
        match self {
            SlotType::Core => &[TimeSlot::Morning, TimeSlot::Day],
            SlotType::Support => &[TimeSlot::Day, TimeSlot::Evening],
            SlotType::Emergency => &[TimeSlot::Evening],
            SlotType::Rest => &[TimeSlot::Evening],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotType::Core => "CORE",
            SlotType::Support => "SUPPORT",
            SlotType::Emergency => "EMERGENCY",
            SlotType::Rest => "REST",
        }
    }
}

impl FromStr for SlotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CORE" => Ok(SlotType::Core),
            "SUPPORT" => Ok(SlotType::Support),
            "EMERGENCY" => Ok(SlotType::Emergency),
            "REST" => Ok(SlotType::Rest),
            _ => Err(format!("Invalid slot type: {s}")),
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wall-clock period a step is delivered in.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeSlot {
    Morning,
    Day,
    Evening,
}

impl TimeSlot {
    /// All time slots in delivery order.
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Day, TimeSlot::Evening];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Morning => "MORNING",
            TimeSlot::Day => "DAY",
            TimeSlot::Evening => "EVENING",
        }
    }
}

impl FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MORNING" => Ok(TimeSlot::Morning),
            "DAY" => Ok(TimeSlot::Day),
            "EVENING" => Ok(TimeSlot::Evening),
            _ => Err(format!("Invalid time slot: {s}")),
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user composition constraints. Forbidden lists are matched
/// case-insensitively against catalog tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPolicy {
    #[serde(default)]
    pub forbidden_categories: Vec<String>,
    #[serde(default)]
    pub forbidden_impact_areas: Vec<String>,
    #[serde(default)]
    pub preferred_time_slots: Vec<TimeSlot>,
}

impl UserPolicy {
    pub fn allows_category(&self, category: Focus) -> bool {
        !self
            .forbidden_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category.as_str()))
    }

    pub fn allows_impact_areas(&self, impact_areas: &[String]) -> bool {
        !impact_areas.iter().any(|area| {
            self.forbidden_impact_areas
                .iter()
                .any(|forbidden| forbidden.eq_ignore_ascii_case(area))
        })
    }
}

/// The "Three Pillars" plus optional constraints. The draft builder
/// cannot work unless duration, focus, and load are all present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanParameters {
    pub duration: Option<Duration>,
    pub focus: Option<Focus>,
    pub load: Option<Load>,
    #[serde(default)]
    pub policy: UserPolicy,
}

impl PlanParameters {
    /// True when all three pillars are defined.
    pub fn is_complete(&self) -> bool {
        self.duration.is_some() && self.focus.is_some() && self.load.is_some()
    }

    /// Names of the pillars that are still unset.
    pub fn missing_pillars(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.duration.is_none() {
            missing.push("duration");
        }
        if self.focus.is_none() {
            missing.push("focus");
        }
        if self.load.is_none() {
            missing.push("load");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_day_counts_are_canonical() {
        let days: Vec<u32> = Duration::ALL.iter().map(|d| d.total_days()).collect();
        assert_eq!(days, vec![7, 14, 21, 90]);
        for d in Duration::ALL {
            assert_eq!(Duration::from_days(d.total_days()), Some(d));
        }
        assert_eq!(Duration::from_days(10), None);
    }

    #[test]
    fn test_load_slot_structures() {
        assert_eq!(Load::Lite.slot_structure(), &[SlotType::Core]);
        assert_eq!(Load::Mid.slots_per_day(), 2);
        assert_eq!(Load::Intensive.slots_per_day(), 3);
        assert_eq!(Load::from_slot_count(2), Some(Load::Mid));
        assert_eq!(Load::from_slot_count(4), None);
    }

    #[test]
    fn test_enum_round_trips() {
        for d in Duration::ALL {
            assert_eq!(d.as_str().parse::<Duration>().unwrap(), d);
        }
        for f in Focus::ALL {
            assert_eq!(f.as_str().parse::<Focus>().unwrap(), f);
        }
        for t in TimeSlot::ALL {
            assert_eq!(t.as_str().parse::<TimeSlot>().unwrap(), t);
        }
        assert!("BRUNCH".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn test_missing_pillars_reports_each() {
        let params = PlanParameters {
            focus: Some(Focus::Somatic),
            ..Default::default()
        };
        assert!(!params.is_complete());
        assert_eq!(params.missing_pillars(), vec!["duration", "load"]);
    }

    #[test]
    fn test_policy_forbidden_category_is_case_insensitive() {
        let policy = UserPolicy {
            forbidden_categories: vec!["Somatic".to_string()],
            ..Default::default()
        };
        assert!(!policy.allows_category(Focus::Somatic));
        assert!(policy.allows_category(Focus::Cognitive));
    }
}
