//! Read-only view of the exercise content library.
//!
//! The catalog is loaded once from a structured JSON file (an
//! `inventory` array) and is immutable within a composition run. A
//! default library ships embedded in the crate.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::{Focus, SlotType};

/// A single exercise from the content library, reduced to the fields
/// the composition logic needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub internal_name: String,
    pub category: Focus,
    #[serde(default)]
    pub impact_areas: Vec<String>,
    pub priority_tier: SlotType,
    pub difficulty: u8,
    pub energy_cost: String,
    #[serde(default)]
    pub cooldown_days: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_weight")]
    pub base_weight: f64,
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    inventory: Vec<Exercise>,
}

/// In-memory content catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    /// Builds a catalog directly from exercises (used by tests and the
    /// adaptation engine).
    pub fn new(exercises: Vec<Exercise>) -> Self {
        Self { exercises }
    }

    /// Parses a catalog from content library JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LibraryFile = serde_json::from_str(json).map_err(|e| EngineError::Catalog {
            message: format!("Failed to parse content library: {e}"),
        })?;
        Ok(Self {
            exercises: file.inventory,
        })
    }

    /// Loads a catalog from a content library file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json =
            std::fs::read_to_string(path.as_ref()).map_err(|e| EngineError::FileSystem {
                path: path.as_ref().to_path_buf(),
                source: e,
            })?;
        Self::from_json(&json)
    }

    /// The default library embedded in the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_json(include_str!("../assets/content_library.json"))
    }

    /// All exercises, active or not.
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// Only the exercises currently available for composition.
    pub fn active_exercises(&self) -> Vec<&Exercise> {
        self.exercises.iter().filter(|e| e.is_active).collect()
    }

    /// Finds an exercise by id.
    pub fn get(&self, exercise_id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }
}
