//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for extrema-trader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("bar at {time} is not after the last processed bar at {last}")]
    OutOfOrderBar {
        time: NaiveDateTime,
        last: NaiveDateTime,
    },

    #[error("no bars to process")]
    NoData,

    #[error("broker error: {reason}")]
    Broker { reason: String },

    #[error("notification delivery failed: {reason}")]
    Notify { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = TraderError> = std::result::Result<T, E>;

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) | TraderError::Json(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Data { .. }
            | TraderError::OutOfOrderBar { .. }
            | TraderError::NoData
            | TraderError::Csv(_) => 3,
            TraderError::Broker { .. } | TraderError::Notify { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
