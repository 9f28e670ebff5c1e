//! Profile store.
//!
//! Loads named profiles from TOML documents into an ordered, immutable
//! mapping. Loading never fails: a missing or unparseable source yields an
//! empty store, and a malformed entry is skipped without affecting its
//! siblings. Skips are reported on the tracing channel only.
//!
//! The default store overlays the user-level document
//! (`~/.config/pith/profiles.toml`) with the project-local one
//! (`./.pith/profiles.toml`); project-local definitions win per name.

use crate::error::ProfileError;
use crate::profile::{
    default_schema_version, LlmProfile, Profile, ProfileKind, DEFAULT_PROFILE_NAME,
};
use directories::BaseDirs;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered mapping from profile name to profile, built once per process
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: IndexMap<String, Profile>,
}

/// Raw shape of one `[profiles.<name>]` table. Field validity per kind is
/// checked in `into_profile`.
#[derive(Debug, Deserialize)]
struct RawProfile {
    kind: String,

    #[serde(rename = "schemaVersion", default = "default_schema_version")]
    schema_version: u32,

    #[serde(rename = "systemPromptTemplate")]
    system_prompt_template: Option<String>,

    #[serde(rename = "userPromptTemplate")]
    user_prompt_template: Option<String>,

    #[serde(rename = "llmSettings")]
    llm_settings: Option<crate::profile::LlmSettings>,
}

impl RawProfile {
    fn into_profile(self, name: &str) -> Result<Profile, String> {
        let kind = match self.kind.as_str() {
            "identity" => ProfileKind::Identity,
            "llm" => {
                let defaults = LlmProfile::default();
                let mut settings = self.llm_settings.unwrap_or_default();
                settings.normalize();
                ProfileKind::Llm(LlmProfile {
                    system_prompt_template: self
                        .system_prompt_template
                        .unwrap_or(defaults.system_prompt_template),
                    user_prompt_template: self
                        .user_prompt_template
                        .unwrap_or(defaults.user_prompt_template),
                    settings,
                })
            }
            other => return Err(format!("unknown profile kind '{}'", other)),
        };
        Ok(Profile {
            name: name.to_string(),
            schema_version: self.schema_version,
            kind,
        })
    }
}

impl ProfileStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a store from one TOML document on disk. A missing or unreadable
    /// file and a syntactically invalid document both yield an empty store.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "profile source not readable; using empty store");
                return Self::empty();
            }
        };
        Self::from_toml_str(&content)
    }

    /// Parse a store from TOML text. Invalid documents yield an empty store;
    /// individually malformed entries are skipped.
    pub fn from_toml_str(source: &str) -> Self {
        let value: toml::Value = match source.parse() {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "profile source failed to parse; using empty store");
                return Self::empty();
            }
        };

        let Some(entries) = value.get("profiles").and_then(|v| v.as_table()) else {
            debug!("profile source has no [profiles] table; using empty store");
            return Self::empty();
        };

        let mut store = Self::empty();
        for (name, entry) in entries {
            if name.trim().is_empty() {
                debug!("skipping profile with empty name");
                continue;
            }
            let raw: RawProfile = match entry.clone().try_into() {
                Ok(raw) => raw,
                Err(e) => {
                    debug!(profile = %name, error = %e, "skipping malformed profile entry");
                    continue;
                }
            };
            match raw.into_profile(name) {
                Ok(profile) => store.insert(profile),
                Err(reason) => {
                    debug!(profile = %name, reason = %reason, "skipping malformed profile entry");
                }
            }
        }
        store
    }

    /// Load and overlay several documents. Paths are listed highest priority
    /// first; a name defined in an earlier path shadows later definitions.
    pub fn load_layered(paths: &[PathBuf]) -> Self {
        let mut store = Self::empty();
        for path in paths.iter().rev() {
            for (_, profile) in ProfileStore::load(path).profiles {
                store.insert(profile);
            }
        }
        store
    }

    /// The default source paths: project-local first, then user-level.
    pub fn default_sources() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".pith").join("profiles.toml")];
        if let Some(dirs) = BaseDirs::new() {
            paths.push(dirs.config_dir().join("pith").join("profiles.toml"));
        }
        paths
    }

    /// Load the default layered store.
    pub fn load_default() -> Self {
        Self::load_layered(&Self::default_sources())
    }

    /// Insert a profile; an existing profile with the same name is replaced.
    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Result<&Profile, ProfileError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// The profile named `default`, if present. Absence is not an error.
    pub fn get_default(&self) -> Option<&Profile> {
        self.profiles.get(DEFAULT_PROFILE_NAME)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
