//! User operations for the Engine: registration, timezone, slot times,
//! and FSM-gated state transitions.

use jiff::Timestamp;
use tokio::task;

use super::Engine;
use crate::db::Database;
use crate::error::{EngineError, Result};
use crate::fsm::{self, SessionState};
use crate::models::User;
use crate::params::{SetSlotTimes, SetTimezone};
use crate::schedule::ScheduleRequest;

impl Engine {
    /// Creates the user if needed and returns their record.
    pub async fn ensure_user(&self, user_id: u64, timezone: &str) -> Result<User> {
        let db_path = self.db_path.clone();
        let timezone = timezone.to_string();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.ensure_user(user_id, &timezone)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Retrieves a user by id.
    pub async fn get_user(&self, user_id: u64) -> Result<Option<User>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.get_user(user_id)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Updates the user's IANA timezone string.
    pub async fn set_timezone(&self, params: &SetTimezone) -> Result<()> {
        let db_path = self.db_path.clone();
        let params = params.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.update_user_timezone(params.user_id, &params.timezone)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Replaces the user's slot-time map and recomputes `scheduled_for`
    /// for every future step of their active plans. Returns the
    /// deliveries to re-arrange once this call has returned.
    pub async fn set_slot_times(&self, params: &SetSlotTimes) -> Result<Vec<ScheduleRequest>> {
        let db_path = self.db_path.clone();
        let params = params.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            let requests =
                db.update_user_time_slots(params.user_id, &params.slot_times, Timestamp::now())?;
            log::info!(
                "slot times updated for user {}: {} deliveries recomputed",
                params.user_id,
                requests.len()
            );
            Ok(requests)
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }

    /// Moves the user to a new session state through the FSM gate.
    ///
    /// The transition is validated with [`fsm::can_transition`] and
    /// persisted only when legal; rejections are logged with both states
    /// and surface as `IllegalTransition`.
    pub async fn transition_state(&self, user_id: u64, to: SessionState) -> Result<User> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            let user = db
                .get_user(user_id)?
                .ok_or(EngineError::UserNotFound { id: user_id })?;

            if !fsm::can_transition(user.current_state, to) {
                log::warn!(
                    "illegal state transition rejected for user {user_id}: {} -> {to}",
                    user.current_state
                );
                return Err(EngineError::IllegalTransition {
                    from: user.current_state.to_string(),
                    to: to.to_string(),
                });
            }

            db.update_user_state(user_id, to)?;
            db.get_user(user_id)?
                .ok_or(EngineError::UserNotFound { id: user_id })
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }
}
