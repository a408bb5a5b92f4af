//! Cached resolution of admin entries and group memberships

pub mod group;
pub mod identity;

use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

pub use group::GroupMembershipResolver;
pub use identity::IdentityResolver;

/// Deadline shared by every directory call made on behalf of one request.
///
/// A call still pending when the deadline passes is abandoned and reported as
/// [`AppError::Timeout`], which resolvers treat like any other directory error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline
    pub fn none() -> Self {
        Deadline(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Deadline(Some(Instant::now() + timeout))
    }

    /// Run a directory call under this deadline
    pub async fn run<T, F>(&self, call: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.0 {
            None => fut.await,
            Some(at) => match tokio::time::timeout_at(at, fut).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(call.to_string())),
            },
        }
    }
}

/// Log and count a directory failure that is being folded into "unresolved"
pub(crate) fn record_directory_error(call: &'static str, subject: &str, error: &AppError) {
    metrics::counter!(
        "opsgate_directory_errors_total",
        "call" => call,
        "kind" => error.kind()
    )
    .increment(1);
    if error.is_transient() {
        tracing::warn!(call, subject, error = %error, "Directory lookup failed, treating as unresolved");
    } else {
        tracing::error!(call, subject, error = %error, "Directory returned an unusable response, treating as unresolved");
    }
}
