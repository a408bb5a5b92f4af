//! Slack Web API type definitions
//!
//! Only the fields the access engine reads are modelled.

use crate::directory::{DirectoryGroup, DirectoryUser};
use serde::{Deserialize, Serialize};

/// Slack user object
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
    pub real_name: Option<String>,
    #[serde(default)]
    pub profile: SlackProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackProfile {
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    pub email: Option<String>,
}

impl From<SlackUser> for DirectoryUser {
    fn from(user: SlackUser) -> Self {
        DirectoryUser {
            id: user.id,
            name: user.name,
            real_name: user
                .real_name
                .filter(|v| !v.is_empty())
                .or(user.profile.real_name),
            display_name: user.profile.display_name,
            email: user.profile.email,
            deleted: user.deleted,
        }
    }
}

/// Slack user group object
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUserGroup {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub name: String,
}

impl From<SlackUserGroup> for DirectoryGroup {
    fn from(group: SlackUserGroup) -> Self {
        DirectoryGroup {
            id: group.id,
            handle: group.handle,
            name: group.name,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

/// `users.list` page
#[derive(Debug, Clone, Deserialize)]
pub struct UsersListResponse {
    #[serde(default)]
    pub members: Vec<SlackUser>,
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

/// `users.info` and `users.lookupByEmail`
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub user: SlackUser,
}

/// `usergroups.list`
#[derive(Debug, Clone, Deserialize)]
pub struct UserGroupsListResponse {
    #[serde(default)]
    pub usergroups: Vec<SlackUserGroup>,
}

/// `usergroups.users.list`
#[derive(Debug, Clone, Deserialize)]
pub struct UserGroupUsersResponse {
    #[serde(default)]
    pub users: Vec<String>,
}

/// `chat.postMessage` body
#[derive(Debug, Clone, Serialize)]
pub struct PostMessage<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

/// Error codes Slack returns for an unknown user
pub const USER_NOT_FOUND_ERRORS: &[&str] = &["users_not_found", "user_not_found"];
