//! Data models for drafts, plans, and their composition parameters.
//!
//! The pillar enums ([`Duration`], [`Focus`], [`Load`], [`SlotType`],
//! [`TimeSlot`]) are closed sum types carrying their own metadata tables;
//! derived properties (day counts, slot structures, time preferences) are
//! always computed from the enum, never stored alongside it.

pub mod draft;
pub mod pillars;
pub mod plan;
pub mod status;
pub mod user;
pub mod version;

// Re-export all public types at the models level
pub use draft::{Draft, DraftStep};
pub use pillars::{
    Duration, Focus, IntensityCurve, Load, PlanParameters, SlotType, TimeSlot, UserPolicy,
};
pub use plan::{Plan, PlanDay, PlanStep};
pub use status::PlanStatus;
pub use user::User;
pub use version::{AdaptationRecord, PlanVersion};
