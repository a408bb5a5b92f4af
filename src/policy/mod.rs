//! Access policy: operation classes, admin sets and the live policy store

pub mod loader;

use crate::identity::IdentityRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};

pub use loader::{load_policy, PolicyFile};

/// Operations shipped as the default admin class
pub const DEFAULT_ADMIN_OPERATIONS: &[&str] = &[
    "create_cluster",
    "create_user",
    "reset_password",
    "create_index",
    "insert_document",
    "update_document",
    "delete_document",
    "drop_collection",
    "drop_database",
    "manage_indexes",
];

/// Operations shipped as the default user class
pub const DEFAULT_USER_OPERATIONS: &[&str] = &[
    "list_clusters",
    "list_databases",
    "list_collections",
    "schema_analysis",
    "analyze_performance",
    "slow_queries",
    "missing_indexes",
    "collection_stats",
    "database_stats",
    "help",
];

/// Operations shipped as the default self-service class
pub const DEFAULT_SELF_SERVICE_OPERATIONS: &[&str] =
    &["reset_own_password", "view_own_user_info", "add_ip_whitelist"];

/// The static access policy.
///
/// The operation sets may overlap in storage; the engine's precedence order
/// decides which class wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub enabled: bool,
    pub admin_identities: BTreeSet<String>,
    pub admin_groups: BTreeSet<String>,
    pub admin_operations: BTreeSet<String>,
    pub user_operations: BTreeSet<String>,
    pub self_service_operations: BTreeSet<String>,
    pub notify_on_denied: bool,
    pub log_access_attempts: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_identities: BTreeSet::new(),
            admin_groups: BTreeSet::new(),
            admin_operations: to_set(DEFAULT_ADMIN_OPERATIONS),
            user_operations: to_set(DEFAULT_USER_OPERATIONS),
            self_service_operations: to_set(DEFAULT_SELF_SERVICE_OPERATIONS),
            notify_on_denied: true,
            log_access_attempts: true,
        }
    }
}

impl Policy {
    /// Most restrictive usable policy, used when loading fails
    pub fn fail_closed() -> Self {
        Self {
            enabled: true,
            admin_identities: BTreeSet::new(),
            admin_groups: BTreeSet::new(),
            admin_operations: to_set(&["create_cluster", "create_user"]),
            user_operations: to_set(&["list_clusters", "help"]),
            self_service_operations: to_set(&["reset_password", "add_ip_whitelist"]),
            notify_on_denied: true,
            log_access_attempts: true,
        }
    }

    /// Admin list entries classified by surface form
    pub fn admin_refs(&self) -> impl Iterator<Item = IdentityRef> + '_ {
        self.admin_identities
            .iter()
            .map(|entry| IdentityRef::parse(entry))
    }

    /// Classify an operation by set membership (admin, then user, then self-service)
    pub fn category(&self, operation: &str) -> OperationCategory {
        if self.admin_operations.contains(operation) {
            OperationCategory::Admin
        } else if self.user_operations.contains(operation) {
            OperationCategory::User
        } else if self.self_service_operations.contains(operation) {
            OperationCategory::SelfService
        } else {
            OperationCategory::Unknown
        }
    }

    /// Human-readable dump of the whole policy
    pub fn report(&self) -> String {
        let mut out = String::from("RBAC Configuration Report\n\n");
        out.push_str(&format!(
            "Status: {}\n\n",
            if self.enabled { "Enabled" } else { "Disabled" }
        ));
        push_section(&mut out, "Admin Users", &self.admin_identities);
        push_section(&mut out, "Admin Groups", &self.admin_groups);
        push_section(&mut out, "Admin Operations", &self.admin_operations);
        push_section(&mut out, "User Operations", &self.user_operations);
        push_section(
            &mut out,
            "Self-Service Operations",
            &self.self_service_operations,
        );
        out.push_str(&format!(
            "Notifications: {}\n",
            if self.notify_on_denied { "Enabled" } else { "Disabled" }
        ));
        out.push_str(&format!(
            "Access Logging: {}",
            if self.log_access_attempts { "Enabled" } else { "Disabled" }
        ));
        out
    }
}

fn push_section(out: &mut String, title: &str, items: &BTreeSet<String>) {
    out.push_str(&format!("{}: {}\n", title, items.len()));
    for item in items {
        out.push_str(&format!("  - {}\n", item));
    }
    out.push('\n');
}

pub(crate) fn to_set<S: AsRef<str>>(items: &[S]) -> BTreeSet<String> {
    items
        .iter()
        .map(|item| item.as_ref().trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

/// Operation class, derived from set membership and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    Admin,
    User,
    SelfService,
    Unknown,
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationCategory::Admin => "admin",
            OperationCategory::User => "user",
            OperationCategory::SelfService => "self_service",
            OperationCategory::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Partial policy update. Present fields replace the live value wholesale;
/// sets are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyUpdate {
    pub enabled: Option<bool>,
    pub admin_identities: Option<Vec<String>>,
    pub admin_groups: Option<Vec<String>>,
    pub admin_operations: Option<Vec<String>>,
    pub user_operations: Option<Vec<String>>,
    pub self_service_operations: Option<Vec<String>>,
    pub notify_on_denied: Option<bool>,
    pub log_access_attempts: Option<bool>,
}

impl PolicyUpdate {
    pub fn is_empty(&self) -> bool {
        self == &PolicyUpdate::default()
    }

    /// Produce a new policy with this update applied
    pub fn apply(&self, base: &Policy) -> Policy {
        let mut next = base.clone();
        if let Some(enabled) = self.enabled {
            next.enabled = enabled;
        }
        if let Some(ids) = &self.admin_identities {
            next.admin_identities = to_set(ids);
        }
        if let Some(groups) = &self.admin_groups {
            next.admin_groups = to_set(groups);
        }
        if let Some(ops) = &self.admin_operations {
            next.admin_operations = to_set(ops);
        }
        if let Some(ops) = &self.user_operations {
            next.user_operations = to_set(ops);
        }
        if let Some(ops) = &self.self_service_operations {
            next.self_service_operations = to_set(ops);
        }
        if let Some(notify) = self.notify_on_denied {
            next.notify_on_denied = notify;
        }
        if let Some(log) = self.log_access_attempts {
            next.log_access_attempts = log;
        }
        next
    }
}

/// Holder of the live policy snapshot.
///
/// Readers get an `Arc` to an immutable snapshot; updates build a complete
/// new policy and swap it in, so a reader never sees a half-applied update.
pub struct ConfigurationStore {
    current: RwLock<Arc<Policy>>,
}

impl ConfigurationStore {
    pub fn new(policy: Policy) -> Self {
        Self {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// Load from the structured source, falling back to the environment
    pub fn load(source: &crate::config::PolicySourceConfig) -> Self {
        Self::new(load_policy(&source.path, |key| std::env::var(key).ok()))
    }

    /// The live snapshot
    pub fn current(&self) -> Arc<Policy> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the whole policy
    pub fn replace(&self, policy: Policy) -> Arc<Policy> {
        let next = Arc::new(policy);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::clone(&next);
        next
    }

    /// Merge the given fields into the live policy
    pub fn update(&self, update: &PolicyUpdate) -> Arc<Policy> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = Arc::new(update.apply(&guard));
        *guard = Arc::clone(&next);
        tracing::info!(?update, "RBAC configuration updated");
        next
    }
}
