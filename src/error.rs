use thiserror::Error;

/// Result type for Swagger document generation
pub type SwaggerResult<T> = Result<T, SwaggerError>;

/// Errors that can occur while generating a Swagger document
#[derive(Debug, Error)]
pub enum SwaggerError {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The input API description is malformed
    #[error("API description error: {0}")]
    Description(String),

    /// Internal invariant violation; indicates a bug in the generator,
    /// not bad input
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl SwaggerError {
    /// Create a new API description error
    pub fn description_error<T: ToString>(msg: T) -> Self {
        Self::Description(msg.to_string())
    }

    /// Create a new internal invariant error
    pub fn internal<T: ToString>(msg: T) -> Self {
        Self::Internal(msg.to_string())
    }
}
