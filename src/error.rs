// src/error.rs
//! Error types for the navigator

use std::fmt;

pub type Result<T> = std::result::Result<T, NavError>;

#[derive(Debug)]
pub enum NavError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    /// Unparseable frame: no `$`, or a broken talker/type prefix.
    MalformedSentence(String),
    /// Frame checksum did not match the computed XOR.
    ChecksumMismatch { expected: String, found: String },
    /// One sentence's field count or numeric content was bad.
    FieldParse(String),
    /// No usable position (fix invalid and no remembered position).
    NoValidPosition,
    /// The route has no waypoints to operate on.
    EmptyRoute,
    /// Cursor pointed outside the waypoint sequence.
    RouteCursorInvalid,
    Other(String),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::Io(e) => write!(f, "IO error: {}", e),
            NavError::Serial(e) => write!(f, "Serial error: {}", e),
            NavError::Json(e) => write!(f, "JSON error: {}", e),
            NavError::Connection(msg) => write!(f, "Connection error: {}", msg),
            NavError::MalformedSentence(line) => write!(f, "Malformed sentence: {}", line),
            NavError::ChecksumMismatch { expected, found } => {
                write!(f, "Invalid checksum {}, expecting {}", found, expected)
            }
            NavError::FieldParse(msg) => write!(f, "Field parse error: {}", msg),
            NavError::NoValidPosition => write!(f, "No valid GPS position available"),
            NavError::EmptyRoute => write!(f, "Route contains no waypoints"),
            NavError::RouteCursorInvalid => write!(f, "Route cursor out of range"),
            NavError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for NavError {}

impl NavError {
    /// Per-sentence rejections are absorbed by the ingest loop and only
    /// counted; everything else is surfaced to the caller.
    pub fn is_sentence_error(&self) -> bool {
        matches!(
            self,
            NavError::MalformedSentence(_)
                | NavError::ChecksumMismatch { .. }
                | NavError::FieldParse(_)
        )
    }
}

impl From<std::io::Error> for NavError {
    fn from(error: std::io::Error) -> Self {
        NavError::Io(error)
    }
}

impl From<tokio_serial::Error> for NavError {
    fn from(error: tokio_serial::Error) -> Self {
        NavError::Serial(error)
    }
}

impl From<serde_json::Error> for NavError {
    fn from(error: serde_json::Error) -> Self {
        NavError::Json(error)
    }
}

impl From<anyhow::Error> for NavError {
    fn from(error: anyhow::Error) -> Self {
        NavError::Other(error.to_string())
    }
}
