//! Channel membership check guarding access to the bot

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::gateway::UserId;
use crate::{BotError, Result};

/// How long the oracle may take before the user is treated as a non-member
const ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Status of a user in a channel, as reported by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Owner,
    Admin,
    Member,
    Other,
}

impl MembershipStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Member)
    }
}

/// External service answering "is this user in that channel"
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn membership_status(&self, channel_id: &str, user_id: UserId)
        -> Result<MembershipStatus>;
}

/// Fail-closed wrapper around a [`MembershipOracle`]
#[derive(Clone)]
pub struct MembershipGate {
    oracle: Arc<dyn MembershipOracle>,
    channel_id: String,
    timeout: Duration,
}

impl MembershipGate {
    pub fn new(oracle: Arc<dyn MembershipOracle>, channel_id: impl Into<String>) -> Self {
        Self {
            oracle,
            channel_id: channel_id.into(),
            timeout: ORACLE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// True only for owner/admin/member. Errors, timeouts and unknown users
    /// all count as "not a member".
    pub async fn is_member(&self, user_id: UserId) -> bool {
        match self.check(user_id).await {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Membership check failed, denying access");
                false
            }
        }
    }

    async fn check(&self, user_id: UserId) -> std::result::Result<bool, BotError> {
        let status = tokio::time::timeout(
            self.timeout,
            self.oracle.membership_status(&self.channel_id, user_id),
        )
        .await
        .map_err(|_| BotError::Gate(format!("oracle timed out after {:?}", self.timeout)))?
        .map_err(|e| BotError::Gate(e.to_string()))?;

        tracing::debug!(user_id, ?status, "Membership status");
        Ok(status.is_active())
    }
}
