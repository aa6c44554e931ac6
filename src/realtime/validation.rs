//! Topic validation collaborator.
//!
//! Before subscribing, the client may ask the backend whether a topic
//! belongs to the caller's tenant and is active. A definitive answer is
//! honored; a failed call is resolved by [`ValidationPolicy`].

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{TenantId, TopicId};

use super::options::ValidationPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Request timeout of the HTTP validator.
const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Answer of a validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Topic may be subscribed.
    Valid,
    /// Topic must not be subscribed.
    Invalid {
        /// Reason given by the backend.
        reason: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationRequest<'a> {
    topic_id: &'a TopicId,
    tenant_id: &'a TenantId,
}

/// Body returned by the validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    /// Endpoint processed the request.
    pub success: bool,
    /// Topic belongs to the tenant and is active.
    #[serde(default)]
    pub is_valid: bool,
    /// Explanation when invalid.
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<ValidationResponse> for ValidationOutcome {
    fn from(response: ValidationResponse) -> Self {
        if response.success && response.is_valid {
            Self::Valid
        } else {
            Self::Invalid {
                reason: response.reason,
            }
        }
    }
}

// ============================================================================
// TopicValidator
// ============================================================================

/// Authorizes topics before subscription.
#[async_trait]
pub trait TopicValidator: Send + Sync + 'static {
    /// Checks `topic_id` against `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when no definitive answer could be obtained.
    async fn validate(&self, topic_id: &TopicId, tenant_id: &TenantId)
    -> Result<ValidationOutcome>;
}

/// Resolves a validation result into a subscribe decision.
pub(crate) fn resolve_validation(
    topic_id: &TopicId,
    result: Result<ValidationOutcome>,
    policy: ValidationPolicy,
) -> bool {
    match result {
        Ok(ValidationOutcome::Valid) => true,

        Ok(ValidationOutcome::Invalid { reason }) => {
            warn!(
                topic_id = %topic_id,
                reason = reason.as_deref().unwrap_or("unspecified"),
                "Topic rejected by validation"
            );
            false
        }

        Err(e) => match policy {
            ValidationPolicy::FailOpen => {
                warn!(topic_id = %topic_id, error = %e, "Validation unavailable, subscribing anyway");
                true
            }
            ValidationPolicy::FailClosed => {
                warn!(topic_id = %topic_id, error = %e, "Validation unavailable, rejecting topic");
                false
            }
        },
    }
}

// ============================================================================
// HttpTopicValidator
// ============================================================================

/// Validator backed by an HTTP endpoint.
///
/// Sends `POST {url}` with `{ "topicId", "tenantId" }` and expects
/// `{ "success", "isValid", "reason"? }`.
#[derive(Debug, Clone)]
pub struct HttpTopicValidator {
    client: reqwest::Client,
    url: Url,
}

impl HttpTopicValidator {
    /// Creates a validator with the default 5s request timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_VALIDATION_TIMEOUT)
    }

    /// Creates a validator with a custom request timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TopicValidator for HttpTopicValidator {
    async fn validate(
        &self,
        topic_id: &TopicId,
        tenant_id: &TenantId,
    ) -> Result<ValidationOutcome> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&ValidationRequest {
                topic_id,
                tenant_id,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: ValidationResponse = response.json().await?;

        debug!(
            topic_id = %topic_id,
            success = body.success,
            is_valid = body.is_valid,
            "Validation answered"
        );

        Ok(body.into())
    }
}

/// Validator that rejects nothing. Used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllValidator;

#[async_trait]
impl TopicValidator for AllowAllValidator {
    async fn validate(&self, _: &TopicId, _: &TenantId) -> Result<ValidationOutcome> {
        Ok(ValidationOutcome::Valid)
    }
}

// ============================================================================
// Tests
// ============================================================================
