//! The main Error type for vizcraft

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The unified error type for all vizcraft operations.
///
/// - `kind`: what went wrong
/// - `status`: whether retrying could help
/// - `operation`: where it went wrong, e.g. `sandbox::exec`
/// - `context`: key-value pairs for debugging
/// - `source`: the underlying error, if any
///
/// # Example
///
/// ```rust
/// use vizcraft_error::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::RateLimited, "slow down")
///     .with_operation("provider::openai")
///     .with_context("model", "gpt-5.2-codex");
///
/// assert_eq!(err.kind(), ErrorKind::RateLimited);
/// assert!(err.is_retryable());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error. The status defaults from the kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Look up a context value by key
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    pub fn temporary(self) -> Self {
        self.with_status(ErrorStatus::Temporary)
    }

    pub fn permanent(self) -> Self {
        self.with_status(ErrorStatus::Permanent)
    }

    /// Mark as persistent after failed retries
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    /// Set the operation that caused this error.
    ///
    /// An operation that was already set is kept in context as "called".
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error. Only one source is kept.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }
}

// Display is a single line for logs and CLI output:
//   Kind (status) at operation, context { k: v } => message
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.status)?;
        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }

        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .collect();
            write!(f, ", context {{ {} }}", pairs.join(", "))?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f, "\n    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f, "\n    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f, "\n    Source: {:?}", source)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::IoFailed, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// A required environment variable is missing or empty
    pub fn credential_missing(var: impl Into<String>) -> Self {
        let var = var.into();
        Self::new(
            ErrorKind::CredentialMissing,
            format!("environment variable '{}' is not set", var),
        )
        .with_context("var", var)
    }

    pub fn config_invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, reason).with_context("key", key)
    }

    pub fn sandbox_unavailable(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SandboxUnavailable, reason)
    }

    pub fn sandbox_failed(container: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SandboxFailed, reason).with_context("container", container)
    }

    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InferenceFailed, message)
    }

    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    pub fn turn_limit_exceeded(max: usize) -> Self {
        Self::new(
            ErrorKind::TurnLimitExceeded,
            format!("model still calling tools after {} turns", max),
        )
        .with_context("max_turns", max.to_string())
    }
}
