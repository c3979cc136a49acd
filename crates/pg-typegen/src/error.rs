//! Error types for the generator.

use thiserror::Error;

/// Exit code for configuration and input errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;

/// Exit code for catalog connectivity or query errors.
pub const EXIT_CATALOG_ERROR: u8 = 2;

/// Exit code for emitter state violations.
pub const EXIT_EMIT_ERROR: u8 = 3;

/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for generation runs.
#[derive(Error, Debug)]
pub enum TypegenError {
    /// Configuration error (invalid YAML, missing fields, bad CLI input)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog query failed
    #[error("Catalog query failed: {0}")]
    Catalog(#[from] tokio_postgres::Error),

    /// Connection setup failed
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Declarations were written out of order or after the sink was closed
    #[error("Emit error: {0}")]
    Emit(String),

    /// IO error (output file, config file, snapshot file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TypegenError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        TypegenError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            TypegenError::Config(_) | TypegenError::Yaml(_) | TypegenError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            TypegenError::Catalog(_) | TypegenError::Connection { .. } => EXIT_CATALOG_ERROR,
            TypegenError::Emit(_) => EXIT_EMIT_ERROR,
            TypegenError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, TypegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(TypegenError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            TypegenError::connection("refused", "connecting").exit_code(),
            EXIT_CATALOG_ERROR
        );
        assert_eq!(TypegenError::Emit("closed".into()).exit_code(), EXIT_EMIT_ERROR);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(TypegenError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TypegenError::from(json_err);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: JSON error:"));
    }

    #[test]
    fn test_connection_error_mentions_context() {
        let err = TypegenError::connection("timed out", "opening catalog connection");
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("opening catalog connection"));
    }
}
