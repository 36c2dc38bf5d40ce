use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported sample mode '{0}', expected 'db' or 'query'")]
    UnsupportedMode(String),

    #[error("unknown view '{0}'")]
    UnknownView(String),

    #[error("missing value for parameter ':{0}'")]
    MissingParameter(&'static str),

    #[error("query references unknown parameter ':{0}'")]
    UnknownParameter(String),

    #[error("invalid time window: from ({from}) is after to ({to})")]
    InvalidWindow { from: String, to: String },

    #[error("sample budget must be at least 1, got {0}")]
    InvalidSamples(i64),
}

pub type Result<T> = std::result::Result<T, Error>;
