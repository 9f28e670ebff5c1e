//! Pith: Command Output Distillation
//!
//! Runs an arbitrary child command, captures its output and exit status, and
//! rewrites the captured output through a configurable transformation profile
//! before emitting a single artifact to stdout. Transformation never gets in
//! the way: when a profile or its backend is unavailable, resolution degrades
//! to pass-through output.

pub mod backend;
pub mod cli;
pub mod error;
pub mod exec;
pub mod logging;
pub mod profile;
pub mod resolve;
pub mod store;
pub mod template;
pub mod transform;

pub use resolve::{resolve_transformer, Resolution, ResolutionRequest, ResolutionSource};
pub use transform::Transformer;
