use thiserror::Error;

use crate::games::GameKind;

/// Errors surfaced by the engine's public operations.
///
/// Degenerate game data never produces an error; scoring falls back to
/// neutral defaults instead. Late or stale responses are silently ignored.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid {kind} game configuration: {reason}")]
    InvalidConfig { kind: GameKind, reason: String },

    #[error("persistence failed: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl EngineError {
    pub fn invalid_config(kind: GameKind, reason: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            kind,
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
