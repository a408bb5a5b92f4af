//! Identity directory abstraction
//!
//! The engine talks to the directory only through [`DirectoryClient`]. The
//! Slack Web API implementation lives in [`slack`]; [`memory`] holds a static
//! in-process directory for tooling and tests.

pub mod memory;
pub mod slack;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use memory::StaticDirectory;

/// A directory identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Canonical ID
    pub id: String,
    /// Handle
    pub name: String,
    pub real_name: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl DirectoryUser {
    /// Best human-facing label: display name, then real name, then handle
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(self.real_name.as_deref().filter(|v| !v.is_empty()))
            .unwrap_or(&self.name)
    }
}

/// A named group of identities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub id: String,
    pub handle: String,
    pub name: String,
}

/// Read access to the identity directory.
///
/// Every call may fail with a transport error; callers in this crate fold such
/// failures into "unresolved".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Find an identity by handle, display name or real name
    async fn lookup_by_handle(&self, handle: &str) -> Result<Option<DirectoryUser>>;
    async fn lookup_by_email(&self, email: &str) -> Result<Option<DirectoryUser>>;
    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>>;
    async fn list_group_members(&self, group_id: &str) -> Result<HashSet<String>>;
    async fn get_identity(&self, id: &str) -> Result<Option<DirectoryUser>>;
}

/// Pick the user a handle refers to.
///
/// Tiers are tried in order: exact handle, case-insensitive display name,
/// case-insensitive real name. Deleted users never match. Within a tier the
/// first user wins; more than one candidate is logged as ambiguous.
pub fn match_handle<'a>(users: &'a [DirectoryUser], handle: &str) -> Option<&'a DirectoryUser> {
    let wanted = handle.to_lowercase();
    let eq_ci = |value: Option<&str>| value.is_some_and(|v| v.to_lowercase() == wanted);

    for tier in ["handle", "display_name", "real_name"] {
        let mut candidates = users.iter().filter(|u| {
            !u.deleted
                && match tier {
                    "handle" => u.name == handle,
                    "display_name" => eq_ci(u.display_name.as_deref()),
                    _ => eq_ci(u.real_name.as_deref()),
                }
        });

        if let Some(first) = candidates.next() {
            let others: Vec<&str> = candidates.map(|u| u.id.as_str()).collect();
            if !others.is_empty() {
                tracing::warn!(
                    handle,
                    tier,
                    chosen = %first.id,
                    ignored = ?others,
                    "Ambiguous identity match, using first directory entry"
                );
            }
            return Some(first);
        }
    }

    None
}
