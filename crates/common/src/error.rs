use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Symbol {0} not found")]
    SymbolNotFound(String),

    #[error("Insufficient data: no candles returned")]
    InsufficientData,

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures of an external dependency (exchange, database,
    /// messaging provider) as opposed to bad input or missing data.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Exchange(_)
                | Error::Http(_)
                | Error::Messaging(_)
                | Error::Database(_)
                | Error::Json(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
