//! Skill catalog loading and lookup.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::error::{ConfigError, ConfigResult};

use super::{SkillDefinition, SkillId};

#[derive(Deserialize)]
struct CatalogDocument {
    skills: Vec<SkillDefinition>,
}

/// Validated, read-only collection of skill definitions.
///
/// Definitions are shared with executors through `Arc`, so a running cast
/// keeps its definition alive even if the catalog is replaced.
///
/// # Example
///
/// ```
/// use riftcast_core::skill::SkillCatalog;
///
/// let catalog = SkillCatalog::from_json_str(r#"{
///     "skills": [
///         { "id": "dash", "timeline": [{ "type": "apply_cooldown", "seconds": 1.0 }] }
///     ]
/// }"#).unwrap();
///
/// let dash = catalog.get(&"dash".into()).unwrap();
/// assert!((dash.cooldown() - 1.0).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkillCatalog {
    skills: BTreeMap<SkillId, Arc<SkillDefinition>>,
}

impl SkillCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from definitions, validating each.
    ///
    /// # Errors
    ///
    /// The first validation error or [`ConfigError::DuplicateSkill`].
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = SkillDefinition>,
    ) -> ConfigResult<Self> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    /// Parses `{ "skills": [...] }`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Json`] for malformed documents, otherwise as
    /// [`from_definitions`](Self::from_definitions).
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        let catalog = Self::from_definitions(document.skills)?;
        info!(skills = catalog.len(), "skill catalog loaded");
        Ok(catalog)
    }

    /// Reads and parses a catalog file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validates and adds a definition.
    ///
    /// # Errors
    ///
    /// The definition's validation error, or [`ConfigError::DuplicateSkill`]
    /// if the ID is taken.
    pub fn insert(&mut self, definition: SkillDefinition) -> ConfigResult<()> {
        definition.validate()?;
        if self.skills.contains_key(&definition.id) {
            return Err(ConfigError::DuplicateSkill(definition.id));
        }
        self.skills.insert(definition.id.clone(), Arc::new(definition));
        Ok(())
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, id: &SkillId) -> Option<Arc<SkillDefinition>> {
        self.skills.get(id).cloned()
    }

    /// Returns true if `id` is present.
    #[must_use]
    pub fn contains(&self, id: &SkillId) -> bool {
        self.skills.contains_key(id)
    }

    /// Number of skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Returns true if the catalog holds no skills.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Definitions in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SkillDefinition>> {
        self.skills.values()
    }
}
