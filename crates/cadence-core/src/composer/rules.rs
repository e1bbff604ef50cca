//! Plan composition rules: category distribution, slot allocation,
//! duration pacing, and deterministic exercise selection.
//!
//! Everything in this module is a pure function over its inputs. The
//! rule tables live in exhaustive matches on the pillar enums (see
//! [`crate::models::pillars`]), so adding a variant forces every table
//! to be revisited at compile time.

use std::cmp::Ordering;

use crate::catalog::Exercise;
use crate::models::{Duration, Focus, IntensityCurve, SlotType, TimeSlot, UserPolicy};

/// Share of total slots the dominant focus category receives, plus the
/// ordered complementary categories the remainder is split across.
pub fn focus_distribution(focus: Focus) -> (f64, &'static [(Focus, f64)]) {
    match focus {
        Focus::Somatic => (0.8, &[(Focus::Cognitive, 0.1), (Focus::Rest, 0.1)]),
        Focus::Cognitive => (0.8, &[(Focus::Somatic, 0.1), (Focus::Boundaries, 0.1)]),
        Focus::Boundaries => (0.8, &[(Focus::Cognitive, 0.15), (Focus::Rest, 0.05)]),
        Focus::Rest => (0.9, &[(Focus::Somatic, 0.1)]),
        Focus::Mixed => (
            0.4,
            &[
                (Focus::Somatic, 0.25),
                (Focus::Cognitive, 0.25),
                (Focus::Boundaries, 0.1),
            ],
        ),
    }
}

/// Computes how many of the plan's total slots each category receives.
///
/// The dominant category gets its share of the total; the remainder is
/// split across the complementary categories proportionally to their
/// ratios, with any rounding leftover going back to the dominant. A plan
/// with more than one slot never ends up 100% single-category.
///
/// The result is ordered (dominant first, complementary in table order)
/// so iteration stays deterministic.
pub fn category_distribution(focus: Focus, total_slots: usize) -> Vec<(Focus, usize)> {
    let (dominant_share, complementary) = focus_distribution(focus);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut dominant_count = (total_slots as f64 * dominant_share) as usize;
    let remainder = total_slots - dominant_count;

    let ratio_sum: f64 = complementary.iter().map(|(_, r)| r).sum();
    let mut counts: Vec<(Focus, usize)> = complementary
        .iter()
        .map(|&(cat, ratio)| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let count = (remainder as f64 * (ratio / ratio_sum)) as usize;
            (cat, count)
        })
        .collect();

    let assigned: usize = dominant_count + counts.iter().map(|(_, c)| c).sum::<usize>();
    dominant_count += total_slots - assigned;

    // A plan never consists of a single category unless it only has one slot.
    if total_slots > 1 && dominant_count == total_slots {
        if let Some(first) = counts.first_mut() {
            first.1 = 1;
            dominant_count -= 1;
        }
    }

    let mut result = vec![(focus, dominant_count)];
    result.extend(counts.into_iter().filter(|(_, c)| *c > 0));
    result
}

/// Picks the category for the next slot from the remaining distribution:
/// the dominant focus while it has quota, then the complementary
/// category with the largest remaining quota (ties broken by name).
/// An exhausted distribution falls back to the dominant focus.
pub fn pick_category(distribution: &[(Focus, usize)], focus: Focus) -> Focus {
    let mut remaining: Vec<&(Focus, usize)> =
        distribution.iter().filter(|(_, count)| *count > 0).collect();

    if remaining.is_empty() {
        return focus;
    }
    if let Some(&&(cat, _)) = remaining.iter().find(|(cat, _)| *cat == focus) {
        return cat;
    }
    remaining.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    remaining[0].0
}

/// Decrements the remaining quota for a category, if it has any.
pub fn consume_category(distribution: &mut [(Focus, usize)], category: Focus) {
    if let Some(entry) = distribution.iter_mut().find(|(cat, _)| *cat == category) {
        entry.1 = entry.1.saturating_sub(1);
    }
}

/// Difficulty ceiling for a week, derived from the duration's intensity
/// curve: flat stays at 1 then 2; progressive ramps 1 → 2 → 3; wave
/// repeats a 5-week cycle of 1, 2, 2, 3, 1.
pub fn difficulty_ceiling(week_number: u32, duration: Duration) -> u8 {
    match duration.intensity_curve() {
        IntensityCurve::Flat => {
            if week_number == 1 {
                1
            } else {
                2
            }
        }
        IntensityCurve::Progressive => match week_number {
            1 => 1,
            2 => 2,
            _ => 3,
        },
        IntensityCurve::Wave => match ((week_number - 1) % 5) + 1 {
            1 => 1,
            2 => 2,
            3 => 2,
            4 => 3,
            _ => 1,
        },
    }
}

/// Assigns a concrete time-of-day slot for a slot type.
///
/// Honors the user's preferred slots first (in their order, restricted
/// to the slot type's preference table, then unrestricted), then the
/// table itself, and never reuses a time slot already taken that day.
pub fn pick_time_slot(
    slot_type: SlotType,
    user_preferences: &[TimeSlot],
    used_today: &[TimeSlot],
) -> TimeSlot {
    let table = slot_type.time_preferences();
    let free = |slot: &TimeSlot| !used_today.contains(slot);

    if let Some(&slot) = user_preferences
        .iter()
        .find(|s| free(s) && table.contains(s))
    {
        return slot;
    }
    if let Some(&slot) = user_preferences.iter().find(|s| free(s)) {
        return slot;
    }
    if let Some(&slot) = table.iter().find(|s| free(s)) {
        return slot;
    }
    if let Some(&slot) = TimeSlot::ALL.iter().find(|s| free(s)) {
        return slot;
    }
    table[0]
}

/// FNV-1a 64-bit. Used for the seeded tie-break so identical inputs
/// order identically on every platform and build.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Deterministic candidate order: base weight descending, then the
/// seeded hash of `seed:id` (skipped when no seed is supplied), then
/// internal name, then id. Never random — identical inputs always yield
/// identical drafts.
pub fn candidate_order(seed: &str, a: &Exercise, b: &Exercise) -> Ordering {
    b.base_weight
        .total_cmp(&a.base_weight)
        .then_with(|| {
            if seed.is_empty() {
                Ordering::Equal
            } else {
                let ha = fnv1a_64(format!("{seed}:{}", a.id).as_bytes());
                let hb = fnv1a_64(format!("{seed}:{}", b.id).as_bytes());
                ha.cmp(&hb)
            }
        })
        .then_with(|| a.internal_name.cmp(&b.internal_name))
        .then_with(|| a.id.cmp(&b.id))
}

fn deterministic_choice<'a>(candidates: &[&'a Exercise], seed: &str) -> Option<&'a Exercise> {
    candidates
        .iter()
        .min_by(|a, b| candidate_order(seed, a, b))
        .copied()
}

/// True when the exercise may be used at all: active and not blocked by
/// the user policy.
pub fn usable(exercise: &Exercise, policy: &UserPolicy) -> bool {
    exercise.is_active
        && policy.allows_category(exercise.category)
        && policy.allows_impact_areas(&exercise.impact_areas)
}

fn filter_candidates<'a>(
    exercises: &[&'a Exercise],
    category: Option<Focus>,
    priority_tier: Option<SlotType>,
    max_difficulty: Option<u8>,
    impact_areas: Option<&[String]>,
) -> Vec<&'a Exercise> {
    exercises
        .iter()
        .filter(|e| category.map_or(true, |c| e.category == c))
        .filter(|e| priority_tier.map_or(true, |t| e.priority_tier == t))
        .filter(|e| max_difficulty.map_or(true, |d| e.difficulty <= d))
        .filter(|e| {
            impact_areas.map_or(true, |areas| e.impact_areas.iter().any(|ia| areas.contains(ia)))
        })
        .copied()
        .collect()
}

/// Smart-fallback exercise selection, strict order:
///
/// 1. preferred category + slot tier + difficulty ceiling;
/// 2. exercises sharing an impact-area tag with up to 5 exercises of the
///    preferred category, same tier + difficulty;
/// 3. any usable exercise matching tier + difficulty, category ignored.
///
/// Returns `None` when even the last stage is empty; the builder then
/// retries without the cooldown constraint before giving up.
pub fn select_exercise_with_fallback<'a>(
    exercises: &[&'a Exercise],
    preferred_category: Focus,
    slot_type: SlotType,
    max_difficulty: u8,
    policy: &UserPolicy,
    seed: &str,
) -> Option<&'a Exercise> {
    let available: Vec<&Exercise> = exercises
        .iter()
        .filter(|e| usable(e, policy))
        .copied()
        .collect();
    if available.is_empty() {
        return None;
    }

    let preferred = filter_candidates(
        &available,
        Some(preferred_category),
        Some(slot_type),
        Some(max_difficulty),
        None,
    );
    if !preferred.is_empty() {
        return deterministic_choice(&preferred, seed);
    }

    // Impact beats category when the ideal slot is blocked: collect the
    // tags of the first few exercises in the preferred category and look
    // for anything touching the same areas.
    let category_pool = filter_candidates(exercises, Some(preferred_category), None, None, None);
    if !category_pool.is_empty() {
        let mut shared_areas: Vec<String> = Vec::new();
        for exercise in category_pool.iter().take(5) {
            for area in &exercise.impact_areas {
                if !shared_areas.contains(area) {
                    shared_areas.push(area.clone());
                }
            }
        }
        let fallback = filter_candidates(
            &available,
            None,
            Some(slot_type),
            Some(max_difficulty),
            Some(&shared_areas),
        );
        if !fallback.is_empty() {
            return deterministic_choice(&fallback, seed);
        }
    }

    let last_resort =
        filter_candidates(&available, None, Some(slot_type), Some(max_difficulty), None);
    deterministic_choice(&last_resort, seed)
}
