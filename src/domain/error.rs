//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for betbench.
#[derive(Debug, thiserror::Error)]
pub enum BetbenchError {
    #[error("schema validation failed: {reason}")]
    SchemaValidation { reason: String },

    #[error("invalid portfolio transition: value {before} before, {after} after")]
    InvalidPortfolioTransition { before: f64, after: f64 },

    #[error("no price for market {market_id} on or before {date}")]
    MissingPriceData { market_id: String, date: NaiveDate },

    #[error("cumulative return undefined for {model_id}: initial portfolio value is zero")]
    UndefinedReturn { model_id: String },

    #[error("invalid series: {reason}")]
    InvalidSeries { reason: String },

    #[error("invalid position: {reason}")]
    InvalidPosition { reason: String },

    #[error("invalid portfolio: {reason}")]
    InvalidPortfolio { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BetbenchError {
    pub fn schema(reason: impl Into<String>) -> Self {
        BetbenchError::SchemaValidation {
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        BetbenchError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&BetbenchError> for std::process::ExitCode {
    fn from(err: &BetbenchError) -> Self {
        let code: u8 = match err {
            BetbenchError::Io(_) => 1,
            BetbenchError::ConfigParse { .. }
            | BetbenchError::ConfigMissing { .. }
            | BetbenchError::ConfigInvalid { .. } => 2,
            BetbenchError::Data { .. } | BetbenchError::Json(_) => 3,
            BetbenchError::SchemaValidation { .. } => 4,
            BetbenchError::InvalidPortfolioTransition { .. }
            | BetbenchError::MissingPriceData { .. }
            | BetbenchError::UndefinedReturn { .. }
            | BetbenchError::InvalidSeries { .. }
            | BetbenchError::InvalidPosition { .. }
            | BetbenchError::InvalidPortfolio { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
