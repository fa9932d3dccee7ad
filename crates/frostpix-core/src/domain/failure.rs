//! Operational failure taxonomy
//!
//! Every failure crossing a component boundary carries a kind, a severity,
//! a recoverability flag, a human-readable description, a context map of
//! scalar attributes, and an optional cause chain. Adapters build a
//! [`Failure`] and hand it up through `anyhow::Error`; the sync engine
//! recovers it by downcast to decide between retry, abort and shutdown.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use thiserror::Error;

/// Which subsystem a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential rejection, MFA timeout, session expiry
    Auth,
    /// Transport failures and HTTP status errors
    Network,
    /// Local library layout, locking, and write failures
    Library,
    /// Sync pipeline errors, including download integrity mismatches
    Sync,
    /// Archive engine errors
    Archive,
    /// Signal-delivered shutdown
    Interrupt,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Auth => "auth",
            FailureKind::Network => "network",
            FailureKind::Library => "library",
            FailureKind::Sync => "sync",
            FailureKind::Archive => "archive",
            FailureKind::Interrupt => "interrupt",
        };
        write!(f, "{s}")
    }
}

/// How a failure is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Report through the observer side channel and continue
    Warn,
    /// Abort the current operation
    Fatal,
    /// Shut the process down after releasing the library lock
    Interrupt,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Warn => "warn",
            Severity::Fatal => "fatal",
            Severity::Interrupt => "interrupt",
        };
        write!(f, "{s}")
    }
}

/// An operational failure with routing metadata.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    kind: FailureKind,
    severity: Severity,
    recoverable: bool,
    message: String,
    context: BTreeMap<String, String>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Failure {
    fn new(kind: FailureKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            recoverable: false,
            message: message.into(),
            context: BTreeMap::new(),
            source: None,
        }
    }

    /// An authentication failure (fatal unless marked recoverable).
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Auth, Severity::Fatal, message)
    }

    /// A transport or HTTP status failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, Severity::Fatal, message)
    }

    /// A local library failure.
    pub fn library(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Library, Severity::Fatal, message)
    }

    /// A sync pipeline failure.
    pub fn sync(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Sync, Severity::Fatal, message)
    }

    /// An archive engine failure.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Archive, Severity::Fatal, message)
    }

    /// A signal-delivered shutdown. Never recoverable, never retried.
    pub fn interrupt(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Interrupt, Severity::Interrupt, message)
    }

    /// Marks the failure as recoverable: the sync engine may refresh the
    /// session and retry the pipeline.
    #[must_use]
    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }

    /// Downgrades the failure to a warning (reported, not aborting).
    #[must_use]
    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warn;
        self
    }

    /// Attaches a scalar context attribute.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    // --- Getters ---

    /// Returns the failure kind
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the routing severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns true when the engine may retry after a session refresh
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// Returns true for signal-delivered shutdowns
    pub fn is_interrupt(&self) -> bool {
        self.severity == Severity::Interrupt
    }

    /// Returns the human-readable description
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the scalar context attributes
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }
}

/// Extracts the typed failure from an `anyhow` chain, if present.
pub fn classify(err: &anyhow::Error) -> Option<&Failure> {
    err.chain().find_map(|cause| cause.downcast_ref::<Failure>())
}

/// Whether an error should trigger the engine's refresh-and-retry loop.
///
/// Prefers the typed classification; errors without a [`Failure`] in their
/// chain fall back to conservative transport sniffing (connection resets,
/// timeouts, 429 and 5xx status text), the same classes reqwest surfaces
/// for transient conditions.
pub fn is_recoverable(err: &anyhow::Error) -> bool {
    if let Some(failure) = classify(err) {
        return failure.is_recoverable();
    }

    let text = format!("{err:#}").to_lowercase();
    text.contains("connection")
        || text.contains("timed out")
        || text.contains("timeout")
        || text.contains("broken pipe")
        || text.contains("reset by peer")
        || text.contains("429")
        || text.contains("too many requests")
        || text.contains("500")
        || text.contains("502")
        || text.contains("503")
        || text.contains("504")
}

/// Whether an error is a signal-delivered shutdown.
pub fn is_interrupt(err: &anyhow::Error) -> bool {
    classify(err).is_some_and(Failure::is_interrupt)
}
