//! Error types for Lumen

use thiserror::Error;

/// The main error type for Lumen operations
#[derive(Debug, Error)]
pub enum LumenError {
    #[error("Mesh loading failed for {path}: {reason}")]
    MeshLoad { path: String, reason: String },

    #[error("Unsupported mesh format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for Lumen operations
pub type Result<T> = std::result::Result<T, LumenError>;

impl LumenError {
    pub fn mesh_load(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        LumenError::MeshLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<toml::de::Error> for LumenError {
    fn from(err: toml::de::Error) -> Self {
        LumenError::TomlParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_load_message_names_path() {
        let err = LumenError::mesh_load("models/missing.obj", "file not found");
        let msg = err.to_string();
        assert!(msg.contains("models/missing.obj"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn toml_errors_convert() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("a = ");
        let err: LumenError = parsed.unwrap_err().into();
        assert!(matches!(err, LumenError::TomlParseError(_)));
    }
}
