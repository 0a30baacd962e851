//! Error types for the guild RAG engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("RAG is disabled in configuration")]
    Disabled,

    #[error("Vector store connection error: {0}")]
    Connection(String),

    #[error("Collection dimension mismatch: collection has {collection}, embedding model produces {model}")]
    DimensionMismatch { collection: usize, model: usize },

    #[error("Qdrant error: {0}")]
    Qdrant(#[from] qdrant_client::QdrantError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Content extraction error: {0}")]
    Extraction(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Error::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_disabled() {
        let err = Error::Disabled;
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn display_dimension_mismatch() {
        let err = Error::DimensionMismatch {
            collection: 1536,
            model: 256,
        };
        let msg = err.to_string();
        assert!(msg.contains("1536"));
        assert!(msg.contains("256"));
    }

    #[test]
    fn display_connection() {
        let err = Error::Connection("refused".to_string());
        assert!(err.to_string().contains("connection error"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn display_invalid_argument() {
        let err = Error::InvalidArgument("days must be positive".to_string());
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn from_serde_yaml() {
        let yaml_err = serde_yaml::from_str::<i32>("[broken").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn debug_impl() {
        let err = Error::Embedding("timeout".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Embedding"));
    }
}
