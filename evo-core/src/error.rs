//! The error-kind taxonomy from §7. Most call sites just propagate
//! `anyhow::Result` with `?`; `EvoError` exists for the handful of sites
//! (pipeline retry logic, safety kernel abort logic) that must branch on
//! error *kind* rather than message text.

use thiserror::Error;

/// Whether a failure can be retried, demands a fallback, or must abort
/// the module/pipeline outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unrecoverable: syntax error, unresolvable missing import, parse
    /// failure of generated output.
    Structural,
    /// Usually recoverable by retrying with a stricter prompt.
    Typed,
    /// Recoverable only by falling back to a smaller improvement.
    Behavioral,
    /// Abort the pipeline for this module.
    Systemic,
    /// Non-fatal; recorded and the pipeline continues.
    Operational,
}

#[derive(Debug, Error)]
pub enum EvoError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unresolvable import: {0}")]
    UnresolvableImport(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("test failure: {0}")]
    TestFailure(String),

    #[error("pre-flight baseline exceeded: {0}")]
    BaselineExceeded(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("sandbox breach: {0}")]
    SandboxBreach(String),

    #[error("vcs operation failed: {0}")]
    VcsFailure(String),

    #[error("safety kernel violation: {0}")]
    SafetyViolation(String),
}

impl EvoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) | Self::UnresolvableImport(_) => ErrorKind::Structural,
            Self::Type(_) => ErrorKind::Typed,
            Self::TestFailure(_) => ErrorKind::Behavioral,
            Self::BaselineExceeded(_) | Self::RateLimitExceeded(_) | Self::SandboxBreach(_) => {
                ErrorKind::Systemic
            }
            Self::VcsFailure(_) => ErrorKind::Operational,
            Self::SafetyViolation(_) => ErrorKind::Systemic,
        }
    }

    /// Safety kernel violations immediately abort the module and refuse
    /// further self-evolution until operator intervention, per §7.
    pub fn is_safety_violation(&self) -> bool {
        matches!(self, Self::SafetyViolation(_))
    }
}

/// Find the first `EvoError` in an `anyhow::Error`'s chain, if any.
pub fn downcast_evo_error(err: &anyhow::Error) -> Option<&EvoError> {
    err.downcast_ref::<EvoError>()
}
