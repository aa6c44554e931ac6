//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`RealtimeClient`]
//! instances.
//!
//! # Example
//!
//! ```ignore
//! use hotel_realtime::{RealtimeClient, RealtimeOptions};
//!
//! let client = RealtimeClient::builder()
//!     .websocket_url("wss://realtime.example.com/socket")
//!     .validation_url("https://api.example.com/realtime/validate")
//!     .options(RealtimeOptions::new().with_max_attempts(8))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::transport::{Transport, WebSocketTransport};

use super::client::RealtimeClient;
use super::options::RealtimeOptions;
use super::validation::{AllowAllValidator, HttpTopicValidator, TopicValidator};

// ============================================================================
// Sources
// ============================================================================

#[derive(Clone)]
enum TransportSource {
    Url(String),
    Custom(Arc<dyn Transport>),
}

#[derive(Clone)]
enum ValidatorSource {
    Url(String),
    Custom(Arc<dyn TopicValidator>),
}

// ============================================================================
// RealtimeClientBuilder
// ============================================================================

/// Builder for configuring a [`RealtimeClient`].
///
/// Use [`RealtimeClient::builder()`] to create a new builder.
#[derive(Clone, Default)]
pub struct RealtimeClientBuilder {
    /// Channel transport.
    transport: Option<TransportSource>,
    /// Topic validator; every topic is allowed when unset.
    validator: Option<ValidatorSource>,
    /// Tunables.
    options: RealtimeOptions,
}

impl fmt::Debug for RealtimeClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transport = match &self.transport {
            Some(TransportSource::Url(url)) => url.as_str(),
            Some(TransportSource::Custom(_)) => "<custom>",
            None => "<unset>",
        };
        let validator = match &self.validator {
            Some(ValidatorSource::Url(url)) => url.as_str(),
            Some(ValidatorSource::Custom(_)) => "<custom>",
            None => "<allow all>",
        };

        f.debug_struct("RealtimeClientBuilder")
            .field("transport", &transport)
            .field("validator", &validator)
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// RealtimeClientBuilder Implementation
// ============================================================================

impl RealtimeClientBuilder {
    /// Creates a builder with no transport and default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a WebSocket transport for `url` (`ws://` or `wss://`).
    ///
    /// The URL is checked by [`build`](Self::build).
    #[inline]
    #[must_use]
    pub fn websocket_url(mut self, url: impl Into<String>) -> Self {
        self.transport = Some(TransportSource::Url(url.into()));
        self
    }

    /// Uses a custom transport.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(TransportSource::Custom(Arc::new(transport)));
        self
    }

    /// Validates topics against an HTTP endpoint.
    #[inline]
    #[must_use]
    pub fn validation_url(mut self, url: impl Into<String>) -> Self {
        self.validator = Some(ValidatorSource::Url(url.into()));
        self
    }

    /// Uses a custom topic validator.
    #[inline]
    #[must_use]
    pub fn validator(mut self, validator: impl TopicValidator) -> Self {
        self.validator = Some(ValidatorSource::Custom(Arc::new(validator)));
        self
    }

    /// Sets the client options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: RealtimeOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no transport is set or the options are invalid
    /// - [`Error::Url`] if a URL does not parse
    /// - [`Error::Http`] if the validation HTTP client cannot be built
    pub fn build(self) -> Result<RealtimeClient> {
        self.options.validate()?;

        let transport = self.resolve_transport()?;
        let validator = self.resolve_validator()?;

        Ok(RealtimeClient::from_parts(transport, validator, self.options))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl RealtimeClientBuilder {
    fn resolve_transport(&self) -> Result<Arc<dyn Transport>> {
        match self.transport.clone() {
            Some(TransportSource::Url(url)) => Ok(Arc::new(WebSocketTransport::new(&url)?)),
            Some(TransportSource::Custom(transport)) => Ok(transport),
            None => Err(Error::config(
                "Transport is required. Use .websocket_url() or .transport() to set it.\n\
                 Example: RealtimeClient::builder().websocket_url(\"wss://host/socket\")",
            )),
        }
    }

    fn resolve_validator(&self) -> Result<Arc<dyn TopicValidator>> {
        match self.validator.clone() {
            Some(ValidatorSource::Url(url)) => Ok(Arc::new(HttpTopicValidator::new(&url)?)),
            Some(ValidatorSource::Custom(validator)) => Ok(validator),
            None => Ok(Arc::new(AllowAllValidator)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
