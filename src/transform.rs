//! Output transformers and their factory.
//!
//! A transformer rewrites one captured command output. The factory maps a
//! profile to a concrete transformer through a registry of backend
//! constructors keyed by profile kind; it reports capability failures and
//! never applies fallback policy itself.

use crate::backend::{BackendClient, OllamaBackend, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{BackendError, TransformError};
use crate::profile::{LlmProfile, Profile, ProfileKind};
use crate::template;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Capability that rewrites captured command output for one invocation
#[async_trait]
pub trait Transformer: Send + Sync + std::fmt::Debug {
    async fn transform(
        &self,
        command: &[String],
        stdout: &str,
        stderr: &str,
    ) -> Result<String, BackendError>;

    /// Kind tag of this transformer, for logging and presentation.
    fn kind(&self) -> &'static str;
}

/// Pass-through transformer: emits captured stdout unchanged
#[derive(Debug)]
pub struct IdentityTransformer;

#[async_trait]
impl Transformer for IdentityTransformer {
    async fn transform(
        &self,
        _command: &[String],
        stdout: &str,
        _stderr: &str,
    ) -> Result<String, BackendError> {
        Ok(stdout.to_string())
    }

    fn kind(&self) -> &'static str {
        "identity"
    }
}

/// LLM-backed transformer: renders the profile's prompt templates and sends
/// them through the backend client
pub struct LlmTransformer {
    client: Box<dyn BackendClient>,
    system_prompt_template: String,
    user_prompt_template: String,
    variables: HashMap<String, String>,
}

impl std::fmt::Debug for LlmTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmTransformer")
            .field("system_prompt_template", &self.system_prompt_template)
            .field("user_prompt_template", &self.user_prompt_template)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

impl LlmTransformer {
    pub fn new(client: Box<dyn BackendClient>, profile: &LlmProfile) -> Self {
        Self {
            client,
            system_prompt_template: profile.system_prompt_template.clone(),
            user_prompt_template: profile.user_prompt_template.clone(),
            variables: HashMap::new(),
        }
    }

    /// Add a caller-supplied template variable. The fixed `command`,
    /// `stdout`, and `stderr` variables cannot be shadowed.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl Transformer for LlmTransformer {
    async fn transform(
        &self,
        command: &[String],
        stdout: &str,
        stderr: &str,
    ) -> Result<String, BackendError> {
        let mut variables = self.variables.clone();
        variables.insert("command".to_string(), command.join(" "));
        variables.insert("stdout".to_string(), stdout.to_string());
        variables.insert("stderr".to_string(), stderr.to_string());

        let system_prompt = template::render(&self.system_prompt_template, &variables);
        let user_prompt = template::render(&self.user_prompt_template, &variables);

        self.client.invoke(&system_prompt, &user_prompt).await
    }

    fn kind(&self) -> &'static str {
        "llm"
    }
}

/// Backend constructor registered for one profile kind
pub type BackendConstructor =
    fn(&LlmProfile, Duration) -> Result<Box<dyn BackendClient>, TransformError>;

/// Maps profiles to transformers
pub struct TransformFactory {
    backends: HashMap<&'static str, BackendConstructor>,
    timeout: Duration,
}

impl TransformFactory {
    /// Factory with the built-in backend registrations and default timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Factory with the built-in backend registrations and a caller-supplied
    /// backend request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut factory = Self::bare(timeout);
        factory.register("llm", OllamaBackend::construct);
        factory
    }

    /// Factory with no backend registrations. An `llm` profile handed to a
    /// bare factory fails with `UnregisteredKind`.
    pub fn bare(timeout: Duration) -> Self {
        Self {
            backends: HashMap::new(),
            timeout,
        }
    }

    pub fn register(&mut self, kind: &'static str, constructor: BackendConstructor) {
        self.backends.insert(kind, constructor);
    }

    /// Instantiate the transformer for a profile.
    ///
    /// Identity profiles succeed unconditionally. LLM profiles resolve their
    /// backend constructor lazily from the registry, construct the client,
    /// and probe availability; the probe failing maps to
    /// `BackendConnection`. Fallback on failure is the resolver's job, not
    /// the factory's.
    pub async fn create(&self, profile: &Profile) -> Result<Box<dyn Transformer>, TransformError> {
        match &profile.kind {
            ProfileKind::Identity => Ok(Box::new(IdentityTransformer)),
            ProfileKind::Llm(llm) => {
                let constructor = self.backends.get(profile.kind_name()).ok_or_else(|| {
                    TransformError::UnregisteredKind(profile.kind_name().to_string())
                })?;
                let client = constructor(llm, self.timeout)?;
                if !client.is_available().await {
                    return Err(TransformError::BackendConnection(format!(
                        "model '{}' not available at {}",
                        llm.settings.model_name, llm.settings.server_url
                    )));
                }
                Ok(Box::new(LlmTransformer::new(client, llm)))
            }
        }
    }
}

impl Default for TransformFactory {
    fn default() -> Self {
        Self::new()
    }
}

// Mock backend client for testing. The reply is single-shot; the invocation
// log is shared so tests can inspect rendered prompts after the client has
// been boxed away.
#[cfg(test)]
pub(crate) struct MockBackend {
    available: bool,
    reply: std::sync::Mutex<Option<Result<String, BackendError>>>,
    invocations: std::sync::Arc<std::sync::Mutex<Vec<(String, String)>>>,
}

#[cfg(test)]
impl MockBackend {
    pub fn replying(reply: &str) -> Self {
        Self {
            available: true,
            reply: std::sync::Mutex::new(Some(Ok(reply.to_string()))),
            invocations: Default::default(),
        }
    }

    pub fn failing(error: BackendError) -> Self {
        Self {
            available: true,
            reply: std::sync::Mutex::new(Some(Err(error))),
            invocations: Default::default(),
        }
    }

    pub fn invocation_log(&self) -> std::sync::Arc<std::sync::Mutex<Vec<(String, String)>>> {
        self.invocations.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl BackendClient for MockBackend {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, BackendError> {
        self.invocations
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        self.reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok("Mock reply".to_string()))
    }
}
