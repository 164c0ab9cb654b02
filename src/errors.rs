use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("File with id {0} is not registered yet")]
    UnknownRemovalTarget(String),
    #[error("File {0} is no longer available")]
    UnknownKeyTarget(String),
    #[error("Channel error: {0}")]
    Channel(String),
    #[error("No async runtime available: {0}")]
    Runtime(String),
    #[error("Parsing error")]
    Parse,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for RegistryError {
    fn from(_: serde_json::Error) -> Self {
        Self::Parse
    }
}

impl From<tokio::runtime::TryCurrentError> for RegistryError {
    fn from(value: tokio::runtime::TryCurrentError) -> Self {
        Self::Runtime(value.to_string())
    }
}
