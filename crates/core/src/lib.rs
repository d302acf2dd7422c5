//! Shared types for the rule card compiler: the card schema, the agent
//! manifest, the compiled package, configuration and the error taxonomy.

pub mod card;
pub mod config;
pub mod error;
pub mod manifest;
pub mod package;

pub use card::*;
pub use config::{CompilerConfig, FailurePolicy};
pub use error::*;
pub use manifest::*;
pub use package::*;
