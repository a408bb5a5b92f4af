//! Permission decision engine
//!
//! Precedence, first match wins:
//! 1. RBAC disabled: allow
//! 2. self-service operation on one's own resources: allow
//! 3. admin (direct entry, resolved entry, or admin group member): allow
//! 4. user operation: allow
//! 5. admin operation: deny, and alert admins when configured
//! 6. anything else: deny
//!
//! Directory failures never surface to callers; they only make an identity
//! look like a non-admin.

use crate::config::EngineConfig;
use crate::directory::DirectoryClient;
use crate::identity::IdentityRef;
use crate::notify::{DeniedAccessAlert, NotificationSink};
use crate::policy::{ConfigurationStore, OperationCategory, Policy, PolicyUpdate};
use crate::resolver::{record_directory_error, Deadline, GroupMembershipResolver, IdentityResolver};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Decision reasons
pub mod reasons {
    pub const RBAC_DISABLED: &str = "RBAC disabled";
    pub const SELF_SERVICE: &str = "Self-service operation";
    pub const ADMIN_USER: &str = "Admin user";
    pub const USER_OPERATION: &str = "User operation";
    pub const ADMIN_REQUIRED: &str = "Admin privileges required";
    pub const UNKNOWN_OPERATION: &str = "Unknown operation";
}

/// Log target of access-attempt records
pub const AUDIT_TARGET: &str = "opsgate_core::audit";

/// Result of one permission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: String,
}

impl PermissionDecision {
    pub fn allow(reason: &str) -> Self {
        Self {
            allowed: true,
            reason: reason.to_string(),
        }
    }

    pub fn deny(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: reason.to_string(),
        }
    }
}

/// Operation sets of the live policy, sorted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSummary {
    pub admin_operations: Vec<String>,
    pub user_operations: Vec<String>,
    pub self_service_operations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminKind {
    Direct,
    Group,
}

/// One resolved admin identity or admin group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRosterEntry {
    pub identity_ref: String,
    pub display_name: String,
    pub kind: AdminKind,
}

pub struct PermissionEngine {
    store: Arc<ConfigurationStore>,
    directory: Arc<dyn DirectoryClient>,
    identities: Arc<IdentityResolver>,
    groups: GroupMembershipResolver,
    notifier: Option<Arc<dyn NotificationSink>>,
    /// `None` disables the per-check deadline
    directory_timeout: Option<Duration>,
    /// Alert deliveries still in flight. Dropping the engine aborts them.
    alerts: Mutex<JoinSet<()>>,
}

impl PermissionEngine {
    pub fn new(
        store: Arc<ConfigurationStore>,
        directory: Arc<dyn DirectoryClient>,
        config: &EngineConfig,
    ) -> Self {
        let ttl = config.cache_ttl();
        Self {
            store,
            identities: Arc::new(IdentityResolver::new(Arc::clone(&directory), ttl)),
            groups: GroupMembershipResolver::new(Arc::clone(&directory), ttl),
            directory,
            notifier: None,
            directory_timeout: Some(config.directory_timeout()).filter(|t| !t.is_zero()),
            alerts: Mutex::new(JoinSet::new()),
        }
    }

    /// Deliver denied-admin-operation alerts to `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn default_deadline(&self) -> Deadline {
        self.directory_timeout
            .map(Deadline::after)
            .unwrap_or_default()
    }

    // ============================================================================
    // Decisions
    // ============================================================================

    /// Decide whether `identity` may run `operation`, optionally against `target`
    pub async fn check_permission(
        &self,
        identity: &str,
        operation: &str,
        target: Option<&str>,
    ) -> PermissionDecision {
        self.check(identity, operation, target, self.default_deadline())
            .await
    }

    /// Like [`check_permission`](Self::check_permission) with a caller-chosen
    /// budget for all directory calls the check makes
    pub async fn check_permission_with_deadline(
        &self,
        identity: &str,
        operation: &str,
        target: Option<&str>,
        timeout: Duration,
    ) -> PermissionDecision {
        self.check(identity, operation, target, Deadline::after(timeout))
            .await
    }

    async fn check(
        &self,
        identity: &str,
        operation: &str,
        target: Option<&str>,
        deadline: Deadline,
    ) -> PermissionDecision {
        let started = Instant::now();
        let policy = self.store.current();

        let (allowed, reason) = self
            .decide(&policy, identity, operation, target, deadline)
            .await;

        if policy.log_access_attempts {
            tracing::info!(
                target: AUDIT_TARGET,
                identity,
                operation,
                allowed,
                reason,
                "Permission check"
            );
        }

        counter!(
            "opsgate_permission_checks_total",
            "decision" => if allowed { "allow" } else { "deny" },
            "reason" => reason
        )
        .increment(1);
        histogram!("opsgate_permission_check_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        if allowed {
            PermissionDecision::allow(reason)
        } else {
            PermissionDecision::deny(reason)
        }
    }

    async fn decide(
        &self,
        policy: &Policy,
        identity: &str,
        operation: &str,
        target: Option<&str>,
        deadline: Deadline,
    ) -> (bool, &'static str) {
        if !policy.enabled {
            return (true, reasons::RBAC_DISABLED);
        }

        if policy.self_service_operations.contains(operation)
            && targets_self(identity, operation, target)
        {
            return (true, reasons::SELF_SERVICE);
        }

        if self.is_admin_with_deadline(policy, identity, deadline).await {
            return (true, reasons::ADMIN_USER);
        }

        if policy.user_operations.contains(operation) {
            return (true, reasons::USER_OPERATION);
        }

        if policy.admin_operations.contains(operation) {
            if policy.notify_on_denied {
                self.spawn_denial_alert(policy, identity, operation);
            }
            return (false, reasons::ADMIN_REQUIRED);
        }

        (false, reasons::UNKNOWN_OPERATION)
    }

    /// Whether `identity` holds admin rights under the live policy
    pub async fn is_admin(&self, identity: &str) -> bool {
        let policy = self.store.current();
        self.is_admin_with_deadline(&policy, identity, self.default_deadline())
            .await
    }

    async fn is_admin_with_deadline(
        &self,
        policy: &Policy,
        identity: &str,
        deadline: Deadline,
    ) -> bool {
        if policy.admin_identities.contains(identity) {
            return true;
        }

        for entry in policy.admin_refs() {
            if self
                .identities
                .resolve_with_deadline(&entry, deadline)
                .await
                .is_some_and(|id| id == identity)
            {
                return true;
            }
        }

        for group in &policy.admin_groups {
            if self
                .groups
                .is_member_with_deadline(identity, group, deadline)
                .await
            {
                return true;
            }
        }

        false
    }

    /// Alert admins without holding up the decision
    fn spawn_denial_alert(&self, policy: &Policy, identity: &str, operation: &str) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };

        let identities = Arc::clone(&self.identities);
        let entries: Vec<IdentityRef> = policy.admin_refs().collect();
        let mut alert = DeniedAccessAlert::new(identity, operation, Vec::new());
        let deadline = self.default_deadline();

        let mut alerts = self.alerts();
        // Reap finished deliveries so the set only holds pending ones
        while alerts.try_join_next().is_some() {}
        alerts.spawn(async move {
            for entry in &entries {
                if let Some(id) = identities.resolve_with_deadline(entry, deadline).await {
                    if !alert.recipients.contains(&id) {
                        alert.recipients.push(id);
                    }
                }
            }

            let result = match notifier.notify_denied(&alert).await {
                Ok(()) => "sent",
                Err(e) => {
                    tracing::warn!(
                        identity = %alert.identity,
                        operation = %alert.operation,
                        error = %e,
                        "Denied-access notification failed"
                    );
                    "failed"
                }
            };
            counter!("opsgate_denial_notifications_total", "result" => result).increment(1);
        });
    }

    fn alerts(&self) -> MutexGuard<'_, JoinSet<()>> {
        match self.alerts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Wait until every denial alert spawned so far has been delivered or
    /// has failed. Short-lived callers must await this before the runtime
    /// shuts down, or pending alerts are lost.
    pub async fn wait_for_notifications(&self) {
        let mut pending = std::mem::take(&mut *self.alerts());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Denied-access notification task did not finish");
            }
        }
    }

    // ============================================================================
    // Reporting
    // ============================================================================

    /// Operation sets of the live policy. Does not look at admin status.
    pub fn list_permissions(&self, identity: &str) -> PermissionSummary {
        tracing::debug!(identity, "Listing permissions");
        let policy = self.store.current();
        PermissionSummary {
            admin_operations: policy.admin_operations.iter().cloned().collect(),
            user_operations: policy.user_operations.iter().cloned().collect(),
            self_service_operations: policy.self_service_operations.iter().cloned().collect(),
        }
    }

    /// Display metadata for every configured admin and admin group.
    ///
    /// Entries that cannot be resolved are left out.
    pub async fn admin_roster(&self) -> Vec<AdminRosterEntry> {
        let policy = self.store.current();
        let deadline = self.default_deadline();
        let mut roster = Vec::new();

        for entry in policy.admin_refs() {
            let Some(id) = self.identities.resolve_with_deadline(&entry, deadline).await else {
                tracing::debug!(entry = %entry, "Skipping unresolved admin entry");
                continue;
            };

            match deadline
                .run("get_identity", self.directory.get_identity(&id))
                .await
            {
                Ok(Some(user)) => roster.push(AdminRosterEntry {
                    display_name: user.label().to_string(),
                    identity_ref: id,
                    kind: AdminKind::Direct,
                }),
                Ok(None) => tracing::debug!(id = %id, "Admin identity not in directory"),
                Err(e) => record_directory_error("get_identity", &id, &e),
            }
        }

        if policy.admin_groups.is_empty() {
            return roster;
        }

        match deadline
            .run("list_groups", self.directory.list_groups())
            .await
        {
            Ok(groups) => {
                for handle in &policy.admin_groups {
                    let wanted = handle.trim_start_matches('@');
                    match groups.iter().find(|g| g.handle == wanted) {
                        Some(group) => roster.push(AdminRosterEntry {
                            identity_ref: format!("@{}", group.handle),
                            display_name: if group.name.is_empty() {
                                format!("Group: {}", group.handle)
                            } else {
                                group.name.clone()
                            },
                            kind: AdminKind::Group,
                        }),
                        None => tracing::debug!(group = %handle, "Admin group not in directory"),
                    }
                }
            }
            Err(e) => record_directory_error("list_groups", "admin_groups", &e),
        }

        roster
    }

    pub fn operation_category(&self, operation: &str) -> OperationCategory {
        self.store.current().category(operation)
    }

    pub fn policy_report(&self) -> String {
        self.store.current().report()
    }

    // ============================================================================
    // Policy and cache administration
    // ============================================================================

    pub fn current_policy(&self) -> Arc<Policy> {
        self.store.current()
    }

    /// Apply a partial update and drop every cached resolution
    pub fn update_policy(&self, update: &PolicyUpdate) -> Arc<Policy> {
        let next = self.store.update(update);
        self.clear_caches();
        next
    }

    /// Swap in a whole new policy and drop every cached resolution
    pub fn replace_policy(&self, policy: Policy) -> Arc<Policy> {
        let next = self.store.replace(policy);
        self.clear_caches();
        next
    }

    pub fn clear_caches(&self) {
        self.identities.clear_cache();
        self.groups.clear_cache();
        tracing::info!("RBAC caches cleared");
    }
}

/// Whether a self-service request is aimed at the requester.
///
/// Without an explicit target, only operations named for the caller's own
/// resources (an `own` word, as in `reset_own_password`) qualify.
fn targets_self(identity: &str, operation: &str, target: Option<&str>) -> bool {
    match target {
        Some(target) => target == identity,
        None => operation.split('_').any(|word| word == "own"),
    }
}
