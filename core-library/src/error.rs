use bridge_traits::error::BridgeError;
use bridge_traits::storage::Collection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// The record store is unavailable or rejected a read or write.
    #[error(transparent)]
    Storage(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported schema version {version} for {collection} record {id}")]
    UnsupportedSchema {
        collection: Collection,
        id: String,
        version: u32,
    },

    #[error("{0} not loaded; call load_all first")]
    NotLoaded(&'static str),
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for LibraryError {
    fn from(err: base64::DecodeError) -> Self {
        LibraryError::Serialization(format!("invalid page data: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
