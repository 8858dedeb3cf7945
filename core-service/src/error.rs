use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The stored library could not be opened or read at startup.
    #[error("Library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    /// The document could not be converted. Displays the converter's reason as-is.
    #[error("{reason}")]
    Conversion { file_name: String, reason: String },
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::InitializationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
