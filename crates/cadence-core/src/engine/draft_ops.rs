//! Draft operations for the Engine.

use tokio::task;

use super::Engine;
use crate::composer::build_draft;
use crate::db::Database;
use crate::error::{EngineError, Result};
use crate::models::{Draft, PlanParameters, UserPolicy};
use crate::params::ComposeDraft;

impl Engine {
    /// Composes a draft from the request and stores it as the user's
    /// single pending draft, replacing any previous one.
    ///
    /// Composition itself is pure; only the replacement touches the
    /// database. The returned draft carries its validation errors, if
    /// any — an invalid draft is stored but cannot be activated.
    pub async fn compose_draft(&self, params: &ComposeDraft) -> Result<Draft> {
        let db_path = self.db_path.clone();
        let catalog = self.catalog.clone();
        let params = params.clone();

        task::spawn_blocking(move || {
            let plan_params = PlanParameters {
                duration: params.duration,
                focus: params.focus,
                load: params.load,
                policy: UserPolicy {
                    forbidden_categories: params.forbidden_categories.clone(),
                    forbidden_impact_areas: params.forbidden_impact_areas.clone(),
                    preferred_time_slots: params.preferred_time_slots.clone(),
                },
            };
            let seed = params.user_id.to_string();
            let draft = build_draft(&plan_params, &catalog, &seed)?;

            let mut db = Database::new(&db_path)?;
            db.ensure_user(params.user_id, "UTC")?;
            db.replace_draft(params.user_id, &draft)?;
            log::info!(
                "draft {} composed for user {} ({} steps, valid: {})",
                draft.id,
                params.user_id,
                draft.total_steps(),
                draft.is_valid()
            );
            Ok(draft)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Retrieves the user's pending draft, if any.
    pub async fn get_draft(&self, user_id: u64) -> Result<Option<Draft>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.get_draft(user_id)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }
}
