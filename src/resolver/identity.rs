//! Admin-list entry to canonical ID resolution

use super::{record_directory_error, Deadline};
use crate::cache::{names, TtlCache};
use crate::directory::DirectoryClient;
use crate::error::Result;
use crate::identity::IdentityRef;
use std::sync::Arc;
use std::time::Duration;

/// Resolves handles and emails to canonical IDs through the directory.
///
/// Successful lookups are cached for the TTL whether or not they found
/// anyone; failed lookups are not cached, so the next request retries.
pub struct IdentityResolver {
    directory: Arc<dyn DirectoryClient>,
    cache: TtlCache<String, Option<String>>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn DirectoryClient>, ttl: Duration) -> Self {
        Self {
            directory,
            cache: TtlCache::new(names::HANDLE_TO_ID, ttl),
        }
    }

    pub async fn resolve_to_canonical_id(&self, entry: &IdentityRef) -> Option<String> {
        self.resolve_with_deadline(entry, Deadline::none()).await
    }

    /// Resolve an entry, giving up on the directory at `deadline`
    pub async fn resolve_with_deadline(
        &self,
        entry: &IdentityRef,
        deadline: Deadline,
    ) -> Option<String> {
        if let Some(id) = entry.canonical_id() {
            return Some(id.to_string());
        }

        let key = entry.cache_key();
        if let Some(cached) = self.cache.get(&key.to_string()) {
            return cached;
        }

        match self.lookup(key, deadline).await {
            Ok(resolved) => {
                if resolved.is_none() {
                    tracing::debug!(entry = %entry, "Admin entry did not match any directory identity");
                }
                self.cache.insert(key.to_string(), resolved.clone());
                resolved
            }
            Err(e) => {
                record_directory_error("resolve_identity", key, &e);
                None
            }
        }
    }

    async fn lookup(&self, key: &str, deadline: Deadline) -> Result<Option<String>> {
        if let Some(user) = deadline
            .run("lookup_by_handle", self.directory.lookup_by_handle(key))
            .await?
        {
            return Ok(Some(user.id));
        }

        if key.contains('@') {
            if let Some(user) = deadline
                .run("lookup_by_email", self.directory.lookup_by_email(key))
                .await?
            {
                return Ok(Some(user.id));
            }
        }

        Ok(None)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
