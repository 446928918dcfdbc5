use crate::types::Amount;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient funds: need {need}, have {available}")]
    InsufficientFunds { need: Amount, available: Amount },

    #[error("Player not found: {key}")]
    PlayerNotFound { key: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persona error: {0}")]
    Persona(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn persona(msg: impl Into<String>) -> Self {
        Self::Persona(msg.into())
    }

    pub fn speech(msg: impl Into<String>) -> Self {
        Self::Speech(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
