/// Record store errors
use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Record store error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend-specific failure that has no better category
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted blob is not a valid user array
    #[error("Corrupt user data: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Latitude or longitude outside the valid ranges
    #[error("invalid coordinates for {id}: ({latitude}, {longitude})")]
    InvalidCoordinates {
        id: String,
        latitude: f64,
        longitude: f64,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}
