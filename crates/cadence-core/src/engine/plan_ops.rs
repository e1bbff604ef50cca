//! Plan lifecycle operations for the Engine.

use jiff::Timestamp;
use tokio::task;

use super::Engine;
use crate::db::Database;
use crate::error::{EngineError, Result};
use crate::models::{Plan, PlanStep, PlanVersion};
use crate::schedule::ScheduleRequest;

/// An activated plan together with the deliveries the caller must
/// arrange once its surrounding work has committed.
#[derive(Debug, Clone)]
pub struct ActivatedPlan {
    pub plan: Plan,
    pub schedule_requests: Vec<ScheduleRequest>,
}

impl Engine {
    /// Finalizes the user's pending draft into a live plan, anchored at
    /// the current instant.
    pub async fn activate_plan(&self, user_id: u64) -> Result<ActivatedPlan> {
        self.activate_plan_at(user_id, Timestamp::now()).await
    }

    /// Finalizes the user's pending draft at an explicit activation
    /// instant (exposed for reproducible tests and backfills).
    pub async fn activate_plan_at(
        &self,
        user_id: u64,
        activation: Timestamp,
    ) -> Result<ActivatedPlan> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            let (plan, schedule_requests) = db.finalize_draft(user_id, activation)?;
            log::info!(
                "plan {} activated for user {user_id}: {} days, {} deliveries",
                plan.id,
                plan.total_days,
                schedule_requests.len()
            );
            Ok(ActivatedPlan {
                plan,
                schedule_requests,
            })
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Retrieves a plan by id with its days and steps.
    pub async fn get_plan(&self, plan_id: u64) -> Result<Option<Plan>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.get_plan(plan_id)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// The user's most recent live plan: active, falling back to paused.
    pub async fn current_plan(&self, user_id: u64) -> Result<Option<Plan>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.get_current_plan(user_id)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// The append-only version log for a plan, oldest first.
    pub async fn plan_versions(&self, plan_id: u64) -> Result<Vec<PlanVersion>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.list_versions(plan_id)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Marks a step completed. Terminal and adaptation-cancelled steps
    /// are rejected with a distinct reason.
    pub async fn complete_step(&self, step_id: u64) -> Result<PlanStep> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.complete_step(step_id)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Marks a step skipped (the other terminal state).
    pub async fn skip_step(&self, step_id: u64) -> Result<PlanStep> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.skip_step(step_id)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }
}
