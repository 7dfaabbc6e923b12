//! Error types for feed operations.
//!
//! Every upstream source failure funnels into one taxonomy with structured
//! context, so the orchestrator can report which feed failed doing what and
//! whether retrying is worthwhile.

use std::fmt;

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Structured context for feed errors.
///
/// Identifies where and why an error occurred without forcing callers to
/// parse message strings.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "fetch_jobs", "fetch_segments")
    pub operation: Option<String>,
    /// The feed involved (e.g., "scheduling", "telemetry", "timeclock")
    pub feed: Option<String>,
    /// The subject of the fetch (technician, vehicle, or employee id)
    pub subject: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the feed name.
    pub fn for_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = Some(feed.into());
        self
    }

    /// Set the fetch subject.
    pub fn with_subject(mut self, subject: impl ToString) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref operation) = self.operation {
            parts.push(format!("operation={}", operation));
        }
        if let Some(ref feed) = self.feed {
            parts.push(format!("feed={}", feed));
        }
        if let Some(ref subject) = self.subject {
            parts.push(format!("subject={}", subject));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for feed operations
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Transport-level failure reaching the upstream source.
    /// Typically transient and retryable.
    #[error("Connection failed: {message} {context}")]
    ConnectionFailed {
        message: String,
        context: ErrorContext,
    },

    /// Authentication or authorization rejected by the source.
    #[error("Authentication failed: {message} {context}")]
    AuthFailed {
        message: String,
        context: ErrorContext,
    },

    /// Requested entity does not exist upstream.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// The source throttled the request.
    #[error("Rate limited: {message} {context}")]
    RateLimited {
        message: String,
        context: ErrorContext,
    },

    /// The source responded with data the normalizer cannot interpret.
    #[error("Malformed payload: {message} {context}")]
    MalformedPayload {
        message: String,
        context: ErrorContext,
    },

    /// The source did not respond in time.
    #[error("Timeout: {message} {context}")]
    Timeout {
        message: String,
        context: ErrorContext,
    },

    /// Internal/unexpected errors.
    #[error("Internal error: {message} {context}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl FeedError {
    /// Create a connection error, retryable by default.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a connection error with full context.
    pub fn connection_failed_with_context(
        message: impl Into<String>,
        context: ErrorContext,
    ) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Create an authentication error.
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthFailed {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a not found error with context.
    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    /// Create a rate-limit error, retryable by default.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a malformed payload error.
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a malformed payload error with context.
    pub fn malformed_payload_with_context(
        message: impl Into<String>,
        context: ErrorContext,
    ) -> Self {
        Self::MalformedPayload {
            message: message.into(),
            context,
        }
    }

    /// Create a timeout error, retryable by default.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an internal error with context.
    pub fn internal_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Internal {
            message: message.into(),
            context,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ConnectionFailed { context, .. } => context,
            Self::AuthFailed { context, .. } => context,
            Self::NotFound { context, .. } => context,
            Self::RateLimited { context, .. } => context,
            Self::MalformedPayload { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::Internal { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::ConnectionFailed { context, .. }
            | Self::AuthFailed { context, .. }
            | Self::NotFound { context, .. }
            | Self::RateLimited { context, .. }
            | Self::MalformedPayload { context, .. }
            | Self::Timeout { context, .. }
            | Self::Internal { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}
