use common::NotFound;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("exchange {0} not found in config")]
    UnknownExchange(String),

    #[error("config write error: {0}")]
    WriteError(String),

    #[error("config backend unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownExchange(name) => {
                common::Error::NotFound(NotFound::ExchangeConfig(name))
            }
            other => common::Error::ConfigPersistence(other.to_string()),
        }
    }
}
