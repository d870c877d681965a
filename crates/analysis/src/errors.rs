use protocol_client::ProtocolError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Line-cache invariant breaches. These indicate an editor event that does
/// not match the document the tracker believes it is tracking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("invalid change range {start_line}..={end_line}")]
    InvalidRange { start_line: u32, end_line: u32 },
    #[error("change range {start_line}..={end_line} outside cache of {cache_len} lines")]
    OutOfBounds {
        start_line: u32,
        end_line: u32,
        cache_len: usize,
    },
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("invalid document URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("line cache holds {cache_len} lines but the document has {line_count}")]
    CacheOutOfSync { cache_len: usize, line_count: usize },
    #[error("engine is not ready")]
    NotReady,
}
