//! Transformer resolution.
//!
//! Turns a requested profile name into a ready-to-invoke transformer by
//! walking an ordered fallback chain: explicit profile name, stored
//! `default` profile, environment-derived runtime default, identity.
//! Unavailability-class failures (missing profile, missing backend,
//! unreachable server or model) collapse silently to the identity
//! transformer; programmer-tier failures surface. Resolution itself never
//! fails for unavailability reasons, so the wrapper always receives a
//! usable transformer.

use crate::error::TransformError;
use crate::profile::{EnvDefaults, Profile, RuntimeDefaults};
use crate::store::ProfileStore;
use crate::transform::{IdentityTransformer, TransformFactory, Transformer};
use tracing::debug;

/// One resolution request, consumed once
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest {
    pub profile_name: Option<String>,
}

impl ResolutionRequest {
    /// Request a specific profile by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            profile_name: Some(name.into()),
        }
    }

    /// Request the default profile chain.
    pub fn default_profile() -> Self {
        Self { profile_name: None }
    }
}

/// Which fallback tier produced the transformer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// A stored profile matched by name.
    Profile(String),
    /// The environment-derived runtime default profile.
    RuntimeDefault,
    /// The degraded terminal state: pass-through output.
    Degraded,
}

/// Outcome of one resolution
#[derive(Debug)]
pub struct Resolution {
    pub source: ResolutionSource,
    pub transformer: Box<dyn Transformer>,
}

impl Resolution {
    fn degraded() -> Self {
        Self {
            source: ResolutionSource::Degraded,
            transformer: Box::new(IdentityTransformer),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source == ResolutionSource::Degraded
    }
}

/// One step of the fallback chain. The chain for a request is a fixed
/// ordered slice of steps; the first step that yields a profile commits the
/// resolution, and a step that yields nothing is skipped silently.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Look up the explicitly requested name.
    Named,
    /// Look up the profile literally named `default`.
    StoredDefault,
    /// Ask the runtime-configuration collaborator.
    RuntimeDefault,
}

/// Chain for a request that names a profile. A miss does not fall through
/// to the default tiers.
const EXPLICIT_CHAIN: &[Step] = &[Step::Named];

/// Chain for a request with no profile name.
const DEFAULT_CHAIN: &[Step] = &[Step::StoredDefault, Step::RuntimeDefault];

/// The fallback orchestrator
pub struct Resolver<D: RuntimeDefaults = EnvDefaults> {
    store: ProfileStore,
    factory: TransformFactory,
    defaults: D,
}

impl<D: RuntimeDefaults> Resolver<D> {
    pub fn new(store: ProfileStore, factory: TransformFactory, defaults: D) -> Self {
        Self {
            store,
            factory,
            defaults,
        }
    }

    /// Resolve a transformer for the request.
    ///
    /// Always returns a transformer under configuration- and capability-tier
    /// failures; the only error that escapes is the programmer-tier
    /// `UnregisteredKind`.
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Resolution, TransformError> {
        let chain = if request.profile_name.is_some() {
            EXPLICIT_CHAIN
        } else {
            DEFAULT_CHAIN
        };

        for step in chain {
            let Some((profile, source)) = self.lookup(*step, request) else {
                continue;
            };
            debug!(profile = %profile.name, kind = %profile.kind_name(), "profile selected");
            return match self.factory.create(&profile).await {
                Ok(transformer) => Ok(Resolution {
                    source,
                    transformer,
                }),
                Err(e) if e.is_unavailability() => {
                    debug!(profile = %profile.name, error = %e, "transformer unavailable; degrading to identity");
                    Ok(Resolution::degraded())
                }
                Err(e) => Err(e),
            };
        }

        debug!("no profile resolved; degrading to identity");
        Ok(Resolution::degraded())
    }

    fn lookup(
        &self,
        step: Step,
        request: &ResolutionRequest,
    ) -> Option<(Profile, ResolutionSource)> {
        match step {
            Step::Named => {
                let name = request.profile_name.as_deref()?;
                match self.store.get(name) {
                    Ok(profile) => {
                        Some((profile.clone(), ResolutionSource::Profile(name.to_string())))
                    }
                    Err(e) => {
                        debug!(profile = %name, error = %e, "requested profile not found");
                        None
                    }
                }
            }
            Step::StoredDefault => self
                .store
                .get_default()
                .map(|profile| (profile.clone(), ResolutionSource::Profile(profile.name.clone()))),
            Step::RuntimeDefault => self
                .defaults
                .default_profile()
                .map(|profile| (profile, ResolutionSource::RuntimeDefault)),
        }
    }
}

/// Resolve a transformer against the default layered store, the built-in
/// factory, and environment-backed runtime defaults. This is the core entry
/// point consumed by the execution wrapper.
pub async fn resolve_transformer(
    requested_profile_name: Option<&str>,
) -> Result<Resolution, TransformError> {
    let resolver = Resolver::new(
        ProfileStore::load_default(),
        TransformFactory::new(),
        EnvDefaults,
    );
    let request = ResolutionRequest {
        profile_name: requested_profile_name.map(str::to_string),
    };
    resolver.resolve(&request).await
}
