//! Core library for the Cadence plan composition and adaptation engine.
//!
//! Cadence turns three user-chosen parameters — duration, focus, and
//! load (the "three pillars") — into a deterministic multi-day,
//! multi-slot sequence of exercises, and lets a running plan be adapted
//! (load, difficulty, duration, focus, pause/resume) while preserving
//! consistency, auditability, and safe re-scheduling of pending
//! deliveries.
//!
//! # Architecture
//!
//! - [`catalog`]: read-only view of the exercise content library
//! - [`models`]: pillar enums with metadata tables, drafts, live plans
//! - [`composer`]: deterministic draft builder, rules, and validators
//! - [`fsm`]: the finite-state gate guarding plan/adaptation tunnels
//! - [`adaptation`]: intents, eligibility policy, and plan mutations
//! - [`schedule`]: timezone-aware anchors and delivery instants
//! - [`db`]: SQLite persistence with transactional finalize/adapt
//! - [`engine`]: the high-level async [`Engine`] facade
//!
//! # Quick Start
//!
//! ```rust
//! use cadence_core::{EngineBuilder, params::ComposeDraft};
//! use cadence_core::models::{Duration, Focus, Load, TimeSlot};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = EngineBuilder::new()
//!     .with_database_path(Some("cadence.db"))
//!     .build()
//!     .await?;
//!
//! let draft = engine
//!     .compose_draft(&ComposeDraft {
//!         user_id: 42,
//!         duration: Some(Duration::Short),
//!         focus: Some(Focus::Somatic),
//!         load: Some(Load::Lite),
//!         preferred_time_slots: vec![TimeSlot::Morning],
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("draft {} with {} steps", draft.id, draft.total_steps());
//!
//! let activated = engine.activate_plan(42).await?;
//! for request in &activated.schedule_requests {
//!     // hand to the delivery scheduler, post-commit
//!     println!("step {} at {}", request.step_id, request.scheduled_for);
//! }
//! # Ok(())
//! # }
//! ```

pub mod adaptation;
pub mod catalog;
pub mod composer;
pub mod db;
pub mod engine;
pub mod error;
pub mod fsm;
pub mod models;
pub mod params;
pub mod schedule;

// Re-export commonly used types
pub use adaptation::{AdaptationIntent, AdaptationOutcome, AdaptationRequest};
pub use catalog::{Catalog, Exercise};
pub use db::Database;
pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, Result};
pub use fsm::{can_transition, SessionState};
pub use models::{
    Draft, Duration, Focus, Load, Plan, PlanParameters, PlanStatus, SlotType, TimeSlot, UserPolicy,
};
pub use schedule::{ScheduleRequest, SlotTimes};
