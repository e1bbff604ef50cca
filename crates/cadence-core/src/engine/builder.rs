//! Builder for creating and configuring Engine instances.

use std::path::{Path, PathBuf};

use tokio::task;

use super::Engine;
use crate::catalog::Catalog;
use crate::db::Database;
use crate::error::{EngineError, Result};

/// Builder for creating and configuring [`Engine`] instances.
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    database_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/cadence/cadence.db` or
    /// `~/.local/share/cadence/cadence.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Sets a custom content library file. The embedded default library
    /// is used otherwise.
    pub fn with_catalog_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.catalog_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Builds the configured engine instance.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::FileSystem` if the database path is invalid,
    /// `EngineError::Database` if database initialization fails, and
    /// `EngineError::Catalog` if the content library cannot be parsed.
    pub async fn build(self) -> Result<Engine> {
        let db_path = if let Some(path) = self.database_path {
            path
        } else {
            Self::default_database_path()?
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let catalog = match self.catalog_path {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::embedded()?,
        };

        let db_path_clone = db_path.clone();
        task::spawn_blocking(move || {
            let _db = Database::new(&db_path_clone)?;
            Ok::<(), EngineError>(())
        })
        .await
        .map_err(|e| EngineError::Configuration {
            message: format!("Task join error: {e}"),
        })??;

        Ok(Engine::new(db_path, catalog))
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("cadence")
            .place_data_file("cadence.db")
            .map_err(|e| EngineError::XdgDirectory(e.to_string()))
    }
}
