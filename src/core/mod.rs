//! Core types shared across the crate: configuration and errors.

mod config;
mod error;

pub use config::{Config, ContextConfig, PathsConfig, VerifierConfig, LOCAL_CONFIG_FILE};
pub use error::{WorkflowError, WorkflowResult};
