//! Common test utilities
#![allow(dead_code)]

use async_trait::async_trait;
use opsgate_core::config::EngineConfig;
use opsgate_core::directory::{DirectoryClient, DirectoryGroup, DirectoryUser, StaticDirectory};
use opsgate_core::error::{AppError, Result};
use opsgate_core::notify::{DeniedAccessAlert, NotificationSink};
use opsgate_core::policy::{ConfigurationStore, Policy};
use opsgate_core::PermissionEngine;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const ROOT_ID: &str = "U0000000001";
pub const ALICE_ID: &str = "U0000000002";
pub const BOB_ID: &str = "U0000000003";
pub const OPS_ID: &str = "U0000000004";
pub const DBA_ID: &str = "U0000000005";
pub const OUTSIDER_ID: &str = "U0000000009";

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Workspace used by most scenarios
pub fn workspace() -> StaticDirectory {
    StaticDirectory::new()
        .with_user(DirectoryUser {
            id: ROOT_ID.into(),
            name: "root".into(),
            real_name: Some("Root Admin".into()),
            ..Default::default()
        })
        .with_user(DirectoryUser {
            id: ALICE_ID.into(),
            name: "alice".into(),
            display_name: Some("Alice".into()),
            ..Default::default()
        })
        .with_user(DirectoryUser {
            id: BOB_ID.into(),
            name: "bob".into(),
            ..Default::default()
        })
        .with_user(DirectoryUser {
            id: OPS_ID.into(),
            name: "ops".into(),
            email: Some("ops@example.com".into()),
            ..Default::default()
        })
        .with_user(DirectoryUser {
            id: DBA_ID.into(),
            name: "dana".into(),
            ..Default::default()
        })
        .with_group(
            DirectoryGroup {
                id: "S0001".into(),
                handle: "dba-team".into(),
                name: "DBA Team".into(),
            },
            [DBA_ID],
        )
}

/// Baseline policy: no admins, small operation sets, no alerts
pub fn base_policy() -> Policy {
    Policy {
        enabled: true,
        admin_identities: BTreeSet::new(),
        admin_groups: BTreeSet::new(),
        admin_operations: set(&["create_cluster"]),
        user_operations: set(&["list_clusters"]),
        self_service_operations: set(&["add_ip_whitelist"]),
        notify_on_denied: false,
        log_access_attempts: true,
    }
}

pub fn engine(policy: Policy, directory: Arc<CountingDirectory>) -> PermissionEngine {
    PermissionEngine::new(
        Arc::new(ConfigurationStore::new(policy)),
        directory,
        &EngineConfig::default(),
    )
}

/// Directory wrapper that counts calls and can be switched into an outage
pub struct CountingDirectory {
    inner: StaticDirectory,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl CountingDirectory {
    pub fn new(inner: StaticDirectory) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            delay: None,
        })
    }

    /// Every call sleeps for `delay` before answering
    pub fn slow(inner: StaticDirectory, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            delay: Some(delay),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    async fn enter(&self, method: &'static str) -> Result<()> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Directory(format!("{} unavailable", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for CountingDirectory {
    async fn lookup_by_handle(&self, handle: &str) -> Result<Option<DirectoryUser>> {
        self.enter("lookup_by_handle").await?;
        self.inner.lookup_by_handle(handle).await
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<DirectoryUser>> {
        self.enter("lookup_by_email").await?;
        self.inner.lookup_by_email(email).await
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        self.enter("list_groups").await?;
        self.inner.list_groups().await
    }

    async fn list_group_members(&self, group_id: &str) -> Result<HashSet<String>> {
        self.enter("list_group_members").await?;
        self.inner.list_group_members(group_id).await
    }

    async fn get_identity(&self, id: &str) -> Result<Option<DirectoryUser>> {
        self.enter("get_identity").await?;
        self.inner.get_identity(id).await
    }
}

/// Sink that forwards every alert to a channel
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<DeniedAccessAlert>,
    fail: bool,
    delay: Duration,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DeniedAccessAlert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx, fail: false, delay: Duration::ZERO }), rx)
    }

    /// Takes `delay` to deliver each alert; the alert is recorded once delivered
    pub fn slow(delay: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<DeniedAccessAlert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx, fail: false, delay }), rx)
    }

    /// Records the alert, then reports a delivery failure
    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<DeniedAccessAlert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx, fail: true, delay: Duration::ZERO }), rx)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify_denied(&self, alert: &DeniedAccessAlert) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let _ = self.tx.send(alert.clone());
        if self.fail {
            return Err(AppError::Notification("recipient unreachable".into()));
        }
        Ok(())
    }
}

/// Wait for the next alert
pub async fn next_alert(rx: &mut mpsc::UnboundedReceiver<DeniedAccessAlert>) -> DeniedAccessAlert {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for alert")
        .expect("alert channel closed")
}

/// Assert that no alert arrives within a short grace period
pub async fn assert_no_alert(rx: &mut mpsc::UnboundedReceiver<DeniedAccessAlert>) {
    let received = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(
        !matches!(received, Ok(Some(_))),
        "unexpected alert: {:?}",
        received
    );
}
