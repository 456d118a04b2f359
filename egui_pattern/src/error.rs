use crate::structure::NoteId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("invariant violated in channel {channel} pattern {pattern}: {reason}")]
    InvariantViolation {
        channel: usize,
        pattern: usize,
        reason: String,
    },
    #[error("no pattern in channel {channel} at bar {bar}")]
    MissingPattern { channel: usize, bar: usize },
    #[error("note {0:?} not found")]
    MissingNote(NoteId),
    #[error("channel {0} not found")]
    MissingChannel(usize),
    #[error("instrument {instrument} not found in channel {channel}")]
    MissingInstrument { channel: usize, instrument: usize },
    #[error("invalid options: {0}")]
    Options(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EditorError {
    pub fn invariant(channel: usize, pattern: usize, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::error!("channel {channel} pattern {pattern}: {reason}");
        EditorError::InvariantViolation {
            channel,
            pattern,
            reason,
        }
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        EditorError::Options(err.to_string())
    }
}
