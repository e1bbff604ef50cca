//! Adaptation operations for the Engine.

use jiff::Timestamp;
use tokio::task;

use super::Engine;
use crate::adaptation::AdaptationRequest;
use crate::db::adaptations::AppliedAdaptation;
use crate::db::Database;
use crate::error::{EngineError, Result};

impl Engine {
    /// Applies one adaptation to the user's current plan.
    ///
    /// Eligibility (state, conflict matrix, rate limits), the mutation,
    /// and the audit rows all run in one transaction. The returned
    /// [`AppliedAdaptation`] carries the cancel/schedule requests the
    /// caller must hand to the delivery scheduler after this call
    /// returns — never before.
    pub async fn adapt(
        &self,
        user_id: u64,
        request: AdaptationRequest,
    ) -> Result<AppliedAdaptation> {
        self.adapt_at(user_id, request, Timestamp::now()).await
    }

    /// [`adapt`](Self::adapt) with an explicit effective-from instant
    /// (exposed for reproducible tests).
    pub async fn adapt_at(
        &self,
        user_id: u64,
        request: AdaptationRequest,
        now: Timestamp,
    ) -> Result<AppliedAdaptation> {
        let db_path = self.db_path.clone();
        let catalog = self.catalog.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            let applied = db.apply_adaptation(user_id, &request, &catalog, now);
            if let Err(ref err) = applied {
                if let Some(reason) = err.eligibility_reason() {
                    log::warn!(
                        "adaptation {} blocked for user {user_id}: {reason}",
                        request.intent()
                    );
                }
            }
            applied
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }
}
