//! posterforge-common: shared types, errors, configuration and cancellation.
//!
//! Every other posterforge crate depends on this one for the domain model
//! (libraries, items, ratings, poster results), the unified error type, the
//! scoped [`RunContext`] and the YAML configuration.

pub mod config;
pub mod context;
pub mod error;
pub mod filters;
pub mod types;

// Re-export the most commonly used items at the crate root.
pub use config::Config;
pub use context::RunContext;
pub use error::{ContextError, Error, Handle, Result};
pub use types::*;
