//! Group membership checks

use super::{record_directory_error, Deadline};
use crate::cache::{names, TtlCache};
use crate::directory::DirectoryClient;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Answers "is identity X a member of group G", cached per (identity, group).
///
/// A group that does not exist is a cached `false`. Directory errors also
/// answer `false` but are never cached, so a short outage cannot lock an
/// admin out for a whole TTL.
pub struct GroupMembershipResolver {
    directory: Arc<dyn DirectoryClient>,
    cache: TtlCache<(String, String), bool>,
}

impl GroupMembershipResolver {
    pub fn new(directory: Arc<dyn DirectoryClient>, ttl: Duration) -> Self {
        Self {
            directory,
            cache: TtlCache::new(names::GROUP_MEMBERSHIP, ttl),
        }
    }

    pub async fn is_member(&self, identity: &str, group_handle: &str) -> bool {
        self.is_member_with_deadline(identity, group_handle, Deadline::none())
            .await
    }

    pub async fn is_member_with_deadline(
        &self,
        identity: &str,
        group_handle: &str,
        deadline: Deadline,
    ) -> bool {
        let key = (identity.to_string(), group_handle.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        match self.lookup(identity, group_handle, deadline).await {
            Ok(is_member) => {
                self.cache.insert(key, is_member);
                is_member
            }
            Err(e) => {
                record_directory_error("group_membership", group_handle, &e);
                false
            }
        }
    }

    async fn lookup(&self, identity: &str, group_handle: &str, deadline: Deadline) -> Result<bool> {
        let wanted = group_handle.trim_start_matches('@');
        let groups = deadline
            .run("list_groups", self.directory.list_groups())
            .await?;

        let Some(group) = groups.into_iter().find(|g| g.handle == wanted) else {
            tracing::debug!(group = group_handle, "Admin group not found in directory");
            return Ok(false);
        };

        let members = deadline
            .run(
                "list_group_members",
                self.directory.list_group_members(&group.id),
            )
            .await?;

        Ok(members.contains(identity))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
