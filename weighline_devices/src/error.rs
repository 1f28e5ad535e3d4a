use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("http client: {0}")]
    Client(String),
    #[error("invalid device url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DeviceError>;
