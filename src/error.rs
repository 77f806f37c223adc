use crate::protocol::Stage;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `stopgate`.
///
/// Each failure class is its own variant so that the agent can branch on it:
/// retry, abort the stop attempt, or fall back to a degraded mode. No variant
/// ever means "no stop needed".
#[derive(Debug, Error)]
pub enum ClarifyError {
    // ── Local validation (never retried) ───────────────────────────────
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("semantic content detected in structural field `{field}`")]
    SemanticContent { field: String },

    // ── Transport (transient) ──────────────────────────────────────────
    #[error("network error: {message}")]
    Network { message: String, retryable: bool },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Remote said no ─────────────────────────────────────────────────
    #[error("service responded {status}: {message}")]
    Service { status: u16, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("circuit breaker open, retry in {retry_after_ms}ms")]
    CircuitOpen { retry_after_ms: u64 },

    // ── Setup-time (fatal) ─────────────────────────────────────────────
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    // ── Protocol discipline ────────────────────────────────────────────
    #[error("unresolved stop at stage {stage}: {reason}")]
    UnresolvedStop { stage: Stage, reason: String },

    // ── Local provider ─────────────────────────────────────────────────
    #[error("no directive candidates for stage={stage} mode={mode} pattern={pattern}")]
    NoCandidates {
        stage: String,
        mode: String,
        pattern: String,
    },

    #[error("selector contract violated: {0}")]
    Selection(String),

    #[error("directive source failed: {0}")]
    Source(String),

    // ── Generic fallthrough (wraps anyhow for interop) ─────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

const REDACTED: &str = "[REDACTED]";

impl ClarifyError {
    /// Whether the remote client may transparently retry after this error.
    ///
    /// Timeouts, explicitly retryable network failures and 5xx responses are
    /// transient. Everything else is terminal, including `CircuitOpen`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Network { retryable, .. } => *retryable,
            Self::Service { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether this failure should count toward the circuit breaker threshold.
    pub fn trips_breaker(&self) -> bool {
        self.is_retryable()
    }

    /// Replace every occurrence of `secret` in the error's message text.
    ///
    /// `Other` errors are flattened into `Protocol` since the wrapped chain
    /// cannot be rewritten in place.
    pub fn redact(self, secret: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        let scrub = |text: String| scrub_text(&text, secret);

        match self {
            Self::Validation(msg) => Self::Validation(scrub(msg)),
            Self::SemanticContent { field } => Self::SemanticContent {
                field: scrub(field),
            },
            Self::Network { message, retryable } => Self::Network {
                message: scrub(message),
                retryable,
            },
            Self::Service { status, message } => Self::Service {
                status,
                message: scrub(message),
            },
            Self::Protocol(msg) => Self::Protocol(scrub(msg)),
            Self::Configuration(msg) => Self::Configuration(scrub(msg)),
            Self::Authentication(msg) => Self::Authentication(scrub(msg)),
            Self::UnresolvedStop { stage, reason } => Self::UnresolvedStop {
                stage,
                reason: scrub(reason),
            },
            Self::NoCandidates {
                stage,
                mode,
                pattern,
            } => Self::NoCandidates {
                stage,
                mode,
                pattern: scrub(pattern),
            },
            Self::Selection(msg) => Self::Selection(scrub(msg)),
            Self::Source(msg) => Self::Source(scrub(msg)),
            Self::Other(err) => {
                let flattened = format!("{err:#}");
                if flattened.contains(secret) {
                    Self::Protocol(scrub(flattened))
                } else {
                    Self::Other(err)
                }
            }
            other @ (Self::Timeout { .. } | Self::CircuitOpen { .. }) => other,
        }
    }
}

impl ClarifyError {
    /// Redacted rendering for log lines, leaving `self` untouched.
    pub(crate) fn redacted_message(&self, secret: &str) -> String {
        let text = self.to_string();
        if secret.is_empty() {
            text
        } else {
            scrub_text(&text, secret)
        }
    }
}

impl ClarifyError {
    /// Text safe to hand to observers.
    ///
    /// `Other` wraps collaborator errors, such as renderer failures, whose
    /// text may quote the caller's local context; only its class is reported.
    pub(crate) fn event_summary(&self) -> String {
        match self {
            Self::Other(_) => "collaborator failure".to_string(),
            other => other.to_string(),
        }
    }
}

fn scrub_text(text: &str, secret: &str) -> String {
    if text.contains(secret) {
        text.replace(secret, REDACTED)
    } else {
        text.to_string()
    }
}

// ─── Result alias ───────────────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ClarifyError>;
