//! Static in-process directory

use super::{match_handle, DirectoryClient, DirectoryGroup, DirectoryUser};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Directory backed by fixed data.
///
/// Used when no directory service is configured: canonical IDs still work,
/// handles only resolve if they were registered here.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: Vec<DirectoryUser>,
    groups: Vec<DirectoryGroup>,
    members: HashMap<String, HashSet<String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: DirectoryUser) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_group<I, S>(mut self, group: DirectoryGroup, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.insert(
            group.id.clone(),
            members.into_iter().map(Into::into).collect(),
        );
        self.groups.push(group);
        self
    }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
    async fn lookup_by_handle(&self, handle: &str) -> Result<Option<DirectoryUser>> {
        Ok(match_handle(&self.users, handle).cloned())
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<DirectoryUser>> {
        Ok(self
            .users
            .iter()
            .find(|u| {
                !u.deleted
                    && u
                        .email
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        Ok(self.groups.clone())
    }

    async fn list_group_members(&self, group_id: &str) -> Result<HashSet<String>> {
        self.members
            .get(group_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found", group_id)))
    }

    async fn get_identity(&self, id: &str) -> Result<Option<DirectoryUser>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        StaticDirectory::new()
            .with_user(DirectoryUser {
                id: "U0000000002".into(),
                name: "alice".into(),
                email: Some("alice@example.com".into()),
                ..Default::default()
            })
            .with_group(
                DirectoryGroup {
                    id: "S0001".into(),
                    handle: "dba-team".into(),
                    name: "DBA Team".into(),
                },
                ["U0000000002"],
            )
    }

    #[tokio::test]
    async fn test_lookups() {
        let dir = directory();

        assert_eq!(
            dir.lookup_by_handle("alice").await.unwrap().unwrap().id,
            "U0000000002"
        );
        assert_eq!(
            dir.lookup_by_email("ALICE@example.com").await.unwrap().unwrap().id,
            "U0000000002"
        );
        assert!(dir.get_identity("U0000000002").await.unwrap().is_some());
        assert!(dir.get_identity("U9999999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_groups() {
        let dir = directory();

        let groups = dir.list_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert!(dir
            .list_group_members("S0001")
            .await
            .unwrap()
            .contains("U0000000002"));
        assert!(matches!(
            dir.list_group_members("S9999").await,
            Err(AppError::NotFound(_))
        ));
    }
}
