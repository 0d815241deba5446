/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the dispatch
/// loop and the scheduler can decide between recovering locally and surfacing
/// a failure notice to the user.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("completion error: {0}")]
    Completion(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short, stable name of the error class (used as a structured log field).
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Storage(_) => "storage",
            Error::Transport(_) => "transport",
            Error::Completion(_) => "completion",
            Error::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
