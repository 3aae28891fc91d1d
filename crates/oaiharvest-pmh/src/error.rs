//! Error taxonomy for the harvest pipeline

use oaiharvest_core::HttpError;

/// Error from a harvest run.
///
/// `Transport` and `Protocol` abort the harvest gracefully (checkpoint
/// preserved for a later resume); the remaining variants are hard errors
/// surfaced to the caller.
#[derive(Debug)]
pub enum HarvestError {
    /// Invalid configuration, nothing was harvested
    Config(String),
    /// Checkpoint file exists but does not parse; refusing to restart
    /// from zero
    CorruptCheckpoint { line: String },
    /// Non-retryable HTTP failure from the remote endpoint
    Transport(HttpError),
    /// OAI-PMH error element or a response the parser cannot make sense of
    Protocol(String),
    /// Local I/O failure (sink or checkpoint write)
    Io(std::io::Error),
}

impl std::fmt::Display for HarvestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::CorruptCheckpoint { line } => {
                write!(f, "unknown number of parts in checkpoint file: {line:?}")
            }
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for HarvestError {}

impl HarvestError {
    /// Whether the harvest should abort and keep the checkpoint rather
    /// than propagate a hard failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol(_))
    }
}

impl From<HttpError> for HarvestError {
    fn from(e: HttpError) -> Self {
        Self::Transport(e)
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Protocol(format!("malformed XML: {e}"))
    }
}
