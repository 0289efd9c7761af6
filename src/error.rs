use thiserror::Error;

/// Upper bound on sub-commands in one `batch.json` round trip.
pub const BATCH_LIMIT: usize = 50;

/// Errors that escape the gateway.
///
/// Transport failures (connection refused, non-2xx, bad JSON) are not
/// represented here: the gateway logs them and hands back an empty result.
/// What remains means the caller used the gateway wrong, or the session
/// could not be built at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("session is not open; call open() before issuing requests")]
    SessionNotOpen,

    #[error("batch supports at most {limit} commands, got {given}")]
    BatchTooLarge { limit: usize, given: usize },

    #[error("could not create HTTP session: {0}")]
    SessionInit(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

impl ConfigError {
    /// Remediation text printed under the error.
    pub fn hint(&self) -> &'static str {
        match self {
            ConfigError::MissingVar(_) => {
                "Make sure your .env file (or environment) contains:\n  BITRIX24_WEBHOOK_URL=https://<portal>/rest/<user>/<token>\n  ANTHROPIC_API_KEY=... (optional, enables chat summaries)"
            }
            ConfigError::InvalidValue { .. } => "Fix the value in .env or unset it to use the default.",
        }
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("could not load the current user profile")]
    Profile,

    #[error("invalid report window: {0}")]
    InvalidWindow(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;
