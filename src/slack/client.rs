//! Slack Web API client
//!
//! Wraps the handful of Web API methods the access engine needs: user and
//! user-group reads for identity resolution, and `chat.postMessage` for
//! denial alerts.

use crate::config::SlackConfig;
use crate::error::{AppError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use super::types::*;

/// Page size requested from `users.list`
const USERS_PAGE_LIMIT: &str = "200";

/// Slack Web API client
#[derive(Clone)]
pub struct SlackClient {
    api_url: String,
    bot_token: String,
    http_client: Client,
}

/// Outcome of a call that reached Slack
enum ApiOutcome {
    Ok(Value),
    ApiError(String),
}

impl SlackClient {
    /// Create a new Slack client
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .ok_or_else(|| AppError::BadRequest("SLACK_BOT_TOKEN is required".to_string()))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token,
            http_client,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }

    /// Check the `ok` envelope every Web API response carries
    async fn read_outcome(method: &str, response: reqwest::Response) -> Result<ApiOutcome> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Directory(format!(
                "{} failed: {} - {}",
                method, status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Directory(format!("Failed to parse {} response: {}", method, e)))?;

        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(ApiOutcome::Ok(body))
        } else {
            let code = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            Ok(ApiOutcome::ApiError(code))
        }
    }

    async fn get(&self, method: &str, query: &[(&str, &str)]) -> Result<ApiOutcome> {
        let response = self
            .http_client
            .get(self.url(method))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Directory(format!("Failed to call {}: {}", method, e)))?;

        Self::read_outcome(method, response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<ApiOutcome> {
        let response = self
            .http_client
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Failed to call {}: {}", method, e)))?;

        Self::read_outcome(method, response).await
    }

    fn decode<T: DeserializeOwned>(method: &str, outcome: ApiOutcome) -> Result<T> {
        match outcome {
            ApiOutcome::Ok(body) => serde_json::from_value(body).map_err(|e| {
                tracing::debug!(method, error = %e, "Unexpected Slack response shape");
                AppError::from(e)
            }),
            ApiOutcome::ApiError(code) => {
                Err(AppError::Directory(format!("{} returned {}", method, code)))
            }
        }
    }

    /// Like `decode`, but the listed error codes mean "no such entity"
    fn decode_optional<T: DeserializeOwned>(
        method: &str,
        outcome: ApiOutcome,
        not_found: &[&str],
    ) -> Result<Option<T>> {
        match outcome {
            ApiOutcome::ApiError(code) if not_found.contains(&code.as_str()) => Ok(None),
            other => Self::decode(method, other).map(Some),
        }
    }

    // ============================================================================
    // Users
    // ============================================================================

    /// List every workspace member, following pagination cursors
    pub async fn users_list(&self) -> Result<Vec<SlackUser>> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        let mut seen = HashSet::new();

        loop {
            let page: UsersListResponse = {
                let mut query = vec![("limit", USERS_PAGE_LIMIT)];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor.as_str()));
                }
                Self::decode("users.list", self.get("users.list", &query).await?)?
            };
            members.extend(page.members);

            if page.response_metadata.next_cursor.is_empty() {
                break;
            }
            // A cursor we already followed would loop forever
            if !seen.insert(page.response_metadata.next_cursor.clone()) {
                return Err(AppError::Directory(format!(
                    "users.list returned cursor {} twice",
                    page.response_metadata.next_cursor
                )));
            }
            cursor = page.response_metadata.next_cursor;
        }

        Ok(members)
    }

    /// Look up a user by email address
    pub async fn users_lookup_by_email(&self, email: &str) -> Result<Option<SlackUser>> {
        let outcome = self
            .get("users.lookupByEmail", &[("email", email)])
            .await?;
        let response: Option<UserResponse> =
            Self::decode_optional("users.lookupByEmail", outcome, USER_NOT_FOUND_ERRORS)?;
        Ok(response.map(|r| r.user))
    }

    /// Get a user by ID
    pub async fn users_info(&self, user_id: &str) -> Result<Option<SlackUser>> {
        let outcome = self.get("users.info", &[("user", user_id)]).await?;
        let response: Option<UserResponse> =
            Self::decode_optional("users.info", outcome, USER_NOT_FOUND_ERRORS)?;
        Ok(response.map(|r| r.user))
    }

    // ============================================================================
    // User Groups
    // ============================================================================

    pub async fn usergroups_list(&self) -> Result<Vec<SlackUserGroup>> {
        let response: UserGroupsListResponse =
            Self::decode("usergroups.list", self.get("usergroups.list", &[]).await?)?;
        Ok(response.usergroups)
    }

    pub async fn usergroups_users_list(&self, usergroup_id: &str) -> Result<Vec<String>> {
        let outcome = self
            .get("usergroups.users.list", &[("usergroup", usergroup_id)])
            .await?;
        let response: UserGroupUsersResponse = Self::decode("usergroups.users.list", outcome)?;
        Ok(response.users)
    }

    // ============================================================================
    // Chat
    // ============================================================================

    /// Post a message to a channel or user ID
    pub async fn chat_post_message(&self, channel: &str, text: &str) -> Result<()> {
        let outcome = self
            .post("chat.postMessage", &PostMessage { channel, text })
            .await?;
        match outcome {
            ApiOutcome::Ok(_) => Ok(()),
            ApiOutcome::ApiError(code) => Err(AppError::Notification(format!(
                "chat.postMessage to {} returned {}",
                channel, code
            ))),
        }
    }
}
