//! Slack-backed directory

use super::{match_handle, DirectoryClient, DirectoryGroup, DirectoryUser};
use crate::error::Result;
use crate::slack::SlackClient;
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
impl DirectoryClient for SlackClient {
    async fn lookup_by_handle(&self, handle: &str) -> Result<Option<DirectoryUser>> {
        let users: Vec<DirectoryUser> = self
            .users_list()
            .await?
            .into_iter()
            .map(DirectoryUser::from)
            .collect();
        Ok(match_handle(&users, handle).cloned())
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<DirectoryUser>> {
        Ok(self
            .users_lookup_by_email(email)
            .await?
            .map(DirectoryUser::from))
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        Ok(self
            .usergroups_list()
            .await?
            .into_iter()
            .map(DirectoryGroup::from)
            .collect())
    }

    async fn list_group_members(&self, group_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .usergroups_users_list(group_id)
            .await?
            .into_iter()
            .collect())
    }

    async fn get_identity(&self, id: &str) -> Result<Option<DirectoryUser>> {
        Ok(self.users_info(id).await?.map(DirectoryUser::from))
    }
}
