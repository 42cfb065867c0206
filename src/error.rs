use thiserror::Error;

/// Failures reported by a question gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: Unable to connect to server ({0})")]
    Transport(String),
    #[error("Server Error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Malformed question payload: {0}")]
    MalformedPayload(String),
}

impl FetchError {
    /// Short label used in the debug log so contract violations stand out from network trouble.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Server { .. } => "server",
            Self::MalformedPayload(_) => "malformed-payload",
        }
    }
}

/// Reasons a session transition is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("there is no question to answer")]
    NoQuestion,
    #[error("this question has already been answered")]
    AlreadyAnswered,
    #[error("option {index} is out of range for a question with {len} choices")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("a question is still loading")]
    FetchInFlight,
    #[error("another question is only offered after an incorrect answer")]
    RemediationNotOffered,
    #[error("no topic has been selected")]
    NoTopic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}
