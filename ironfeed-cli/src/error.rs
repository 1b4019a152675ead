//! CLI-specific error types and exit code mapping

use ironfeed_core::error::IronfeedError;
use ironfeed_engine::FeedEngineError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// An operator command was rejected by the engine (no active run, not paused, ...).
    #[error("{0}")]
    Operator(String),

    /// The feed could not be downloaded or parsed.
    #[error("feed error: {0}")]
    Feed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | General / command error      |
    /// | 2    | Configuration error          |
    /// | 3    | Operator command rejected    |
    /// | 4    | Feed fetch or parse failure  |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Operator(_) => 3,
            Self::Feed(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<IronfeedError> for CliError {
    fn from(e: IronfeedError) -> Self {
        match e {
            IronfeedError::Config(inner) => Self::Config(inner.to_string()),
            IronfeedError::Operator(inner) => Self::Operator(inner.to_string()),
            IronfeedError::Fetch(inner) => Self::Feed(inner.to_string()),
            IronfeedError::Parse(inner) => Self::Feed(inner.to_string()),
            IronfeedError::Export(inner) => Self::Command(inner.to_string()),
            IronfeedError::Io(inner) => Self::Io(inner),
        }
    }
}

impl From<FeedEngineError> for CliError {
    fn from(e: FeedEngineError) -> Self {
        IronfeedError::from(e).into()
    }
}
