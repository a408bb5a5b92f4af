//! OpsGate Core - Access Control Decision Engine
//!
//! Decides whether a chat identity may run a database operation, based on a
//! static role policy and identity/group data from a directory service.

pub mod cache;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod identity;
pub mod notify;
pub mod policy;
pub mod resolver;
pub mod slack;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use engine::{PermissionDecision, PermissionEngine};
pub use error::{AppError, Result};
