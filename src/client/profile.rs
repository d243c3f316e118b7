//! Local profile state
//!
//! The browser keeps a generated user id and questionnaire state in
//! local storage; this is the same state as a small JSON file in the
//! platform data directory. The id is minted on first access and stable
//! afterward, and never leaves the machine except as explicit request
//! fields.

use crate::conversations::ContextMessage;
use crate::error::{AerinError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const PROFILE_FILE: &str = "profile.json";

/// Persisted local profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Generated id identifying this user to the server
    pub user_id: String,
    /// Whether the onboarding questionnaire was completed or skipped
    pub questionnaire_completed: bool,
    /// Stored questionnaire answers
    #[serde(default)]
    pub answers: Vec<ContextMessage>,
}

impl Profile {
    fn fresh() -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            questionnaire_completed: false,
            answers: Vec::new(),
        }
    }
}

/// File-backed profile store
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Create a store over an explicit profile file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store in the platform data directory
    pub fn default_location() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "aerin")
            .ok_or_else(|| AerinError::Config("Could not determine data directory".to_string()))?;
        Ok(Self::new(dirs.data_dir().join(PROFILE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the profile, minting and persisting a fresh one when absent
    ///
    /// A corrupt profile file is treated as absent and replaced; losing
    /// the generated id only orphans server-side conversations, which is
    /// the same outcome as a cleared browser store.
    pub fn load_or_create(&self) -> Result<Profile> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(profile) => Ok(profile),
                Err(e) => {
                    tracing::warn!("Replacing corrupt profile file: {}", e);
                    self.create_fresh()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.create_fresh(),
            Err(e) => {
                Err(AerinError::Storage(format!("Failed to read profile: {}", e)).into())
            }
        }
    }

    /// Persist the profile
    pub fn save(&self, profile: &Profile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(profile)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Record questionnaire completion with the given answers
    ///
    /// A skip completes with an empty answer list.
    pub fn complete_questionnaire(&self, answers: Vec<ContextMessage>) -> Result<Profile> {
        let mut profile = self.load_or_create()?;
        profile.questionnaire_completed = true;
        profile.answers = answers;
        self.save(&profile)?;
        Ok(profile)
    }

    fn create_fresh(&self) -> Result<Profile> {
        let profile = Profile::fresh();
        self.save(&profile)?;
        Ok(profile)
    }
}
