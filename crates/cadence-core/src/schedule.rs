//! Timezone-aware resolution of calendar anchors and step delivery
//! instants.
//!
//! All wall-clock math happens in the user's timezone via [`jiff`];
//! only the final UTC instants leave this module. DST handling: a
//! wall-clock time that does not exist (spring-forward gap) is shifted
//! forward by one hour; an ambiguous one (fall-back) resolves to the
//! pre-transition instant. Both come from jiff's compatible
//! disambiguation.

use std::collections::BTreeMap;

use jiff::civil::{Date, Time};
use jiff::tz::TimeZone;
use jiff::{Timestamp, ToSpan};
use log::warn;

use crate::error::{EngineError, Result};
use crate::models::TimeSlot;

/// One delivery to arrange with the external scheduler, emitted by
/// finalize/adapt operations strictly as data for post-commit handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub step_id: u64,
    pub scheduled_for: Timestamp,
    pub timezone: String,
}

/// Wall-clock delivery times per time slot. Defaults to the fixed
/// product times; users may override the whole map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTimes {
    times: BTreeMap<TimeSlot, Time>,
}

impl Default for SlotTimes {
    fn default() -> Self {
        let mut times = BTreeMap::new();
        times.insert(TimeSlot::Morning, jiff::civil::time(9, 30, 0, 0));
        times.insert(TimeSlot::Day, jiff::civil::time(14, 0, 0, 0));
        times.insert(TimeSlot::Evening, jiff::civil::time(21, 0, 0, 0));
        Self { times }
    }
}

impl SlotTimes {
    /// Builds a full slot map from `HH:MM` strings. All three slots must
    /// be present.
    pub fn from_strings(raw: &BTreeMap<String, String>) -> Result<Self> {
        let mut times = BTreeMap::new();
        for (key, value) in raw {
            let slot: TimeSlot = key
                .parse()
                .map_err(|e: String| EngineError::InvalidInput {
                    field: "slot_times".to_string(),
                    reason: e,
                })?;
            times.insert(slot, parse_wall_clock(value)?);
        }
        for slot in TimeSlot::ALL {
            if !times.contains_key(&slot) {
                return Err(EngineError::InvalidInput {
                    field: "slot_times".to_string(),
                    reason: format!("missing time for slot {slot}"),
                });
            }
        }
        Ok(Self { times })
    }

    pub fn get(&self, slot: TimeSlot) -> Time {
        // The map is total by construction: Default and from_strings
        // both guarantee all three slots.
        self.times[&slot]
    }

    /// `HH:MM` representation for storage.
    pub fn to_strings(&self) -> BTreeMap<String, String> {
        self.times
            .iter()
            .map(|(slot, time)| {
                (
                    slot.as_str().to_string(),
                    format!("{:02}:{:02}", time.hour(), time.minute()),
                )
            })
            .collect()
    }
}

fn parse_wall_clock(value: &str) -> Result<Time> {
    let invalid = || EngineError::InvalidInput {
        field: "slot_times".to_string(),
        reason: format!("invalid time format: {value}"),
    };
    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: i8 = hour.parse().map_err(|_| invalid())?;
    let minute: i8 = minute.parse().map_err(|_| invalid())?;
    Time::new(hour, minute, 0, 0).map_err(|_| invalid())
}

/// Resolves an IANA timezone name, falling back to UTC when unknown so
/// a bad profile value degrades scheduling instead of breaking it.
pub fn resolve_timezone(name: &str) -> TimeZone {
    match TimeZone::get(name) {
        Ok(tz) => tz,
        Err(_) => {
            warn!("Unknown timezone '{name}', falling back to UTC");
            TimeZone::UTC
        }
    }
}

/// Localizes a civil date + wall-clock time in the given timezone,
/// applying the DST policy (gap → forward one hour, fold →
/// pre-transition).
pub fn localize(date: Date, time: Time, tz: &TimeZone) -> Result<Timestamp> {
    let dt = date.at(time.hour(), time.minute(), 0, 0);
    tz.to_ambiguous_zoned(dt)
        .compatible()
        .map(|zoned| zoned.timestamp())
        .map_err(|e| EngineError::Timezone {
            message: format!("failed to localize {date} {time}: {e}"),
        })
}

/// Resolves the calendar date a plan's day 1 starts on.
///
/// Rule: localize the activation instant; if ANY distinct day-1 time
/// slot's wall-clock instant on the activation date has already passed,
/// the anchor shifts to tomorrow, otherwise day 1 is today.
pub fn resolve_activation_anchor(
    day_one_slots: &[TimeSlot],
    activation: Timestamp,
    tz: &TimeZone,
    slot_times: &SlotTimes,
) -> Result<Date> {
    let local = activation.to_zoned(tz.clone());
    let today = local.date();

    let mut shift = false;
    for &slot in day_one_slots {
        let slot_instant = localize(today, slot_times.get(slot), tz)?;
        if slot_instant <= activation {
            shift = true;
            break;
        }
    }

    if shift {
        today
            .checked_add(1.day())
            .map_err(|e| EngineError::Timezone {
                message: format!("failed to shift anchor date: {e}"),
            })
    } else {
        Ok(today)
    }
}

/// UTC instant of local midnight on the anchor date; stored as the
/// plan's start date.
pub fn anchor_start_instant(anchor: Date, tz: &TimeZone) -> Result<Timestamp> {
    localize(anchor, Time::midnight(), tz)
}

/// Deterministic delivery instant for one step: anchor date plus
/// `day_number - 1` days, at the slot's wall-clock time.
pub fn compute_scheduled_for(
    anchor: Date,
    day_number: u32,
    slot: TimeSlot,
    tz: &TimeZone,
    slot_times: &SlotTimes,
) -> Result<Timestamp> {
    let target = anchor
        .checked_add(i64::from(day_number - 1).days())
        .map_err(|e| EngineError::Timezone {
            message: format!("day {day_number} out of range: {e}"),
        })?;
    localize(target, slot_times.get(slot), tz)
}

/// Derives a plan's anchor date back from its stored start instant.
pub fn anchor_from_start(start: Timestamp, tz: &TimeZone) -> Date {
    start.to_zoned(tz.clone()).date()
}
