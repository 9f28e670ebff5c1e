//! Profile domain types.
//!
//! A profile is a named, declarative description of how captured command
//! output is transformed. Profiles are parsed once per process from the
//! configuration source and are immutable afterwards; the store hands out
//! read-only views.

use serde::Deserialize;

/// Name of the profile consulted when no explicit profile is requested.
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Built-in model used when no configuration supplies one.
pub const DEFAULT_MODEL_NAME: &str = "gpt-oss:20b";

/// Built-in backend server used when no configuration supplies one.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";

/// Environment override for the runtime default model.
pub const MODEL_ENV_VAR: &str = "PITH_LLM_MODEL";

/// Environment override for the runtime default server URL.
pub const SERVER_URL_ENV_VAR: &str = "PITH_LLM_SERVER_URL";

pub const DEFAULT_SYSTEM_PROMPT_TEMPLATE: &str = "Your task is to summarize and distill the \
essential information from the output of the command `$command`. The output may contain \
extraneous information, errors, or formatting artifacts; extract the most relevant and \
accurate information.";

pub const DEFAULT_USER_PROMPT_TEMPLATE: &str = "Command output:\n$stdout\n\nCommand errors:\n$stderr";

/// A named output-transformation profile
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub schema_version: u32,
    pub kind: ProfileKind,
}

/// Closed set of transformation kinds
#[derive(Debug, Clone)]
pub enum ProfileKind {
    /// Pass captured stdout through unchanged.
    Identity,
    /// Rewrite captured output through an LLM backend.
    Llm(LlmProfile),
}

impl Profile {
    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_version: default_schema_version(),
            kind: ProfileKind::Identity,
        }
    }

    pub fn llm(name: impl Into<String>, profile: LlmProfile) -> Self {
        Self {
            name: name.into(),
            schema_version: default_schema_version(),
            kind: ProfileKind::Llm(profile),
        }
    }

    /// Kind tag as it appears in the configuration source.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ProfileKind::Identity => "identity",
            ProfileKind::Llm(_) => "llm",
        }
    }
}

/// Prompt templates and backend settings for an `llm`-kind profile
#[derive(Debug, Clone, Deserialize)]
pub struct LlmProfile {
    #[serde(
        rename = "systemPromptTemplate",
        default = "default_system_prompt_template"
    )]
    pub system_prompt_template: String,

    #[serde(
        rename = "userPromptTemplate",
        default = "default_user_prompt_template"
    )]
    pub user_prompt_template: String,

    #[serde(rename = "llmSettings", default)]
    pub settings: LlmSettings,
}

impl Default for LlmProfile {
    fn default() -> Self {
        Self {
            system_prompt_template: default_system_prompt_template(),
            user_prompt_template: default_user_prompt_template(),
            settings: LlmSettings::default(),
        }
    }
}

/// Backend connection settings for an `llm`-kind profile
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(rename = "modelName", default = "default_model_name")]
    pub model_name: String,

    #[serde(rename = "serverURL", default = "default_server_url")]
    pub server_url: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            server_url: default_server_url(),
        }
    }
}

impl LlmSettings {
    /// Settings from the environment. `PITH_LLM_MODEL` and
    /// `PITH_LLM_SERVER_URL` override the built-in defaults; empty or
    /// whitespace-only values are treated as absent.
    pub fn from_env() -> Self {
        Self {
            model_name: env_or(MODEL_ENV_VAR, DEFAULT_MODEL_NAME),
            server_url: env_or(SERVER_URL_ENV_VAR, DEFAULT_SERVER_URL),
        }
    }

    /// Replace empty or whitespace-only fields with the built-in defaults so
    /// that model and server are always non-empty after expansion.
    pub fn normalize(&mut self) {
        if self.model_name.trim().is_empty() {
            self.model_name = default_model_name();
        }
        if self.server_url.trim().is_empty() {
            self.server_url = default_server_url();
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

pub(crate) fn default_schema_version() -> u32 {
    1
}

fn default_system_prompt_template() -> String {
    DEFAULT_SYSTEM_PROMPT_TEMPLATE.to_string()
}

fn default_user_prompt_template() -> String {
    DEFAULT_USER_PROMPT_TEMPLATE.to_string()
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

/// Runtime-configuration collaborator that can supply a built-in default
/// profile when no stored profile matches a default-profile request.
pub trait RuntimeDefaults: Send + Sync {
    /// The runtime default profile, or `None` when the collaborator is not
    /// configured.
    fn default_profile(&self) -> Option<Profile>;
}

/// Environment-backed runtime defaults. Always configured: the built-in
/// model and server values apply when the environment supplies none.
pub struct EnvDefaults;

impl RuntimeDefaults for EnvDefaults {
    fn default_profile(&self) -> Option<Profile> {
        Some(Profile::llm(
            DEFAULT_PROFILE_NAME,
            LlmProfile {
                settings: LlmSettings::from_env(),
                ..LlmProfile::default()
            },
        ))
    }
}

/// Null collaborator: reports no runtime default is configured.
pub struct NoRuntimeDefaults;

impl RuntimeDefaults for NoRuntimeDefaults {
    fn default_profile(&self) -> Option<Profile> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to serialize environment variable access in tests
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(pairs: &[(&str, Option<&str>)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<(String, Option<String>)> = pairs
            .iter()
            .map(|(var, _)| (var.to_string(), std::env::var(var).ok()))
            .collect();
        for (var, value) in pairs {
            match value {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }

        f();

        for (var, original) in saved {
            match original {
                Some(v) => std::env::set_var(&var, v),
                None => std::env::remove_var(&var),
            }
        }
    }

    #[test]
    fn test_llm_settings_defaults() {
        let settings = LlmSettings::default();
        assert_eq!(settings.model_name, DEFAULT_MODEL_NAME);
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_llm_settings_from_env_overrides() {
        with_env(
            &[
                (MODEL_ENV_VAR, Some("llama3.2:3b")),
                (SERVER_URL_ENV_VAR, Some("http://remote:11434")),
            ],
            || {
                let settings = LlmSettings::from_env();
                assert_eq!(settings.model_name, "llama3.2:3b");
                assert_eq!(settings.server_url, "http://remote:11434");
            },
        );
    }

    #[test]
    fn test_llm_settings_from_env_whitespace_is_absent() {
        with_env(
            &[(MODEL_ENV_VAR, Some("   ")), (SERVER_URL_ENV_VAR, None)],
            || {
                let settings = LlmSettings::from_env();
                assert_eq!(settings.model_name, DEFAULT_MODEL_NAME);
                assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
            },
        );
    }

    #[test]
    fn test_normalize_fills_empty_fields() {
        let mut settings = LlmSettings {
            model_name: "  ".to_string(),
            server_url: String::new(),
        };
        settings.normalize();
        assert_eq!(settings.model_name, DEFAULT_MODEL_NAME);
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_env_defaults_always_configured() {
        with_env(
            &[(MODEL_ENV_VAR, None), (SERVER_URL_ENV_VAR, None)],
            || {
                let profile = EnvDefaults.default_profile().unwrap();
                assert_eq!(profile.name, DEFAULT_PROFILE_NAME);
                match profile.kind {
                    ProfileKind::Llm(llm) => {
                        assert_eq!(llm.settings.model_name, DEFAULT_MODEL_NAME);
                        assert_eq!(llm.settings.server_url, DEFAULT_SERVER_URL);
                    }
                    ProfileKind::Identity => panic!("expected llm kind"),
                }
            },
        );
    }

    #[test]
    fn test_no_runtime_defaults_is_unconfigured() {
        assert!(NoRuntimeDefaults.default_profile().is_none());
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(Profile::identity("p").kind_name(), "identity");
        assert_eq!(Profile::llm("p", LlmProfile::default()).kind_name(), "llm");
    }
}
