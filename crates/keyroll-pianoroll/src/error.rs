use std::io;

use keyroll_reactive::StoreError;
use thiserror::Error;

use crate::song::TrackId;

/// Errors produced by the editor session and its persistence helpers.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
    /// A track index past the end of the song was requested.
    #[error("track index {index} out of range ({len} tracks)")]
    TrackIndexOutOfRange { index: usize, len: usize },
    #[error("track {0} not found")]
    UnknownTrack(TrackId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EditorResult<T> = Result<T, EditorError>;
