use thiserror::Error;

use crate::client::ClientError;
use crate::config::ConfigError;
use crate::dispatcher::EvaluationError;
use crate::event_bus::EventError;
use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
    // event bus
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
