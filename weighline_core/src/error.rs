use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LineError {
    #[error("unknown weight unit {0:?}")]
    UnknownUnit(String),
    #[error("unknown product {0:?}")]
    UnknownProduct(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
