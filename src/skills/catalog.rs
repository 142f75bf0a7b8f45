//! Load skill catalogs from JSON
//!
//! Format: `{"skills": [ {skill}, ... ]}`. Ids must be unique.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::error::{LoadError, NotFoundError};
use crate::core::types::SkillId;
use crate::skills::definitions::Skill;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    skills: Vec<Skill>,
}

/// Immutable snapshot of every skill a match can use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillCatalog {
    skills: BTreeMap<SkillId, Skill>,
}

impl SkillCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list, rejecting duplicate ids
    pub fn from_skills(skills: Vec<Skill>) -> Result<Self, LoadError> {
        let mut catalog = Self::new();
        for skill in skills {
            catalog.insert(skill)?;
        }
        Ok(catalog)
    }

    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::from_skills(file.skills)
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insert(&mut self, skill: Skill) -> Result<(), LoadError> {
        if self.skills.contains_key(&skill.id) {
            return Err(LoadError::DuplicateSkill(skill.id));
        }
        self.skills.insert(skill.id.clone(), skill);
        Ok(())
    }

    pub fn get(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.get(id)
    }

    pub fn require(&self, id: &SkillId) -> Result<&Skill, NotFoundError> {
        self.skills
            .get(id)
            .ok_or_else(|| NotFoundError::Skill(id.clone()))
    }

    pub fn contains(&self, id: &SkillId) -> bool {
        self.skills.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn to_json_string(&self) -> Result<String, LoadError> {
        let file = CatalogFile {
            skills: self.skills.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}
