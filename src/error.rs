use thiserror::Error;

/// Outcome of a failed text-to-speech request.
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Speech synthesis failed: {0}")]
    Failed(#[from] anyhow::Error),

    #[error("Speech synthesis produced empty audio")]
    EmptyAudio,
}

#[derive(Error, Debug)]
pub enum IcecastError {
    /// 4xx reply to the source request: bad credentials or unknown mount
    #[error("Icecast rejected the source: {line}")]
    Rejected { status: u16, line: String },

    #[error("Unexpected Icecast response: {line}")]
    UnexpectedStatus { status: u16, line: String },

    #[error("Icecast closed the connection during the handshake")]
    Closed,

    #[error("Icecast I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IcecastError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, IcecastError::Rejected { .. })
    }
}
