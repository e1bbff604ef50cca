//! Deterministic plan composition: rules, draft builder, validators.
//!
//! ```text
//! PlanParameters + Catalog + seed ──▶ build_draft ──▶ Draft
//!                                         │
//!                                   rules (pure tables)
//!                                         │
//!                                   validate_draft ──▶ violations
//! ```
//!
//! The builder is the only writer; rules and validators are pure
//! functions consulted by it (and by the adaptation engine when it needs
//! replacement exercises).

pub mod builder;
pub mod rules;
pub mod validators;

pub use builder::build_draft;
pub use validators::{validate_draft, DraftViolation};
