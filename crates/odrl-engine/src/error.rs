//! Error types for the ODRL engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, OdrlError>;

/// Errors that can occur while loading policies or serving queries.
#[derive(Debug, Error)]
pub enum OdrlError {
    /// Policy document is not valid JSON.
    #[error("Invalid JSON document: {0}")]
    InvalidJson(String),

    /// Policy document is not valid YAML.
    #[error("Invalid YAML document: {0}")]
    InvalidYaml(String),

    /// Required field is missing from the document.
    #[error("Missing required field: {path}")]
    MissingField { path: String },

    /// Field is present but its value is unusable.
    #[error("Invalid field value for '{path}': {message}")]
    InvalidField { path: String, message: String },

    /// Constraint or policy term uses an operator the engine does not know.
    #[error("Unknown operator '{value}' at {path}")]
    UnknownOperator { path: String, value: String },

    /// Constraint tree nests deeper than the configured bound.
    #[error("Constraint depth exceeds {max} at {path}")]
    DepthExceeded { path: String, max: usize },

    /// Operation on a closed or never-issued engine handle.
    #[error("Invalid engine handle: {0}")]
    InvalidHandle(u64),

    /// Authorization query is missing one of its arguments.
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Engine configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OdrlError {
    /// Builds an [`OdrlError::InvalidField`].
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        OdrlError::InvalidField {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Builds an [`OdrlError::MissingField`].
    pub fn missing(path: impl Into<String>) -> Self {
        OdrlError::MissingField { path: path.into() }
    }

    /// Returns true for the load-time family that aborts engine creation.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            OdrlError::InvalidJson(_)
                | OdrlError::InvalidYaml(_)
                | OdrlError::MissingField { .. }
                | OdrlError::InvalidField { .. }
                | OdrlError::UnknownOperator { .. }
                | OdrlError::DepthExceeded { .. }
        )
    }
}

impl From<serde_json::Error> for OdrlError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            OdrlError::InvalidJson(err.to_string())
        } else {
            OdrlError::Serialization(err.to_string())
        }
    }
}

impl From<serde_yaml::Error> for OdrlError {
    fn from(err: serde_yaml::Error) -> Self {
        OdrlError::InvalidYaml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_family() {
        assert!(OdrlError::missing("permission[0].action").is_parse_error());
        assert!(OdrlError::DepthExceeded { path: "constraint".into(), max: 4 }.is_parse_error());
        assert!(!OdrlError::InvalidHandle(7).is_parse_error());
        assert!(!OdrlError::MalformedQuery("empty action".into()).is_parse_error());
    }

    #[test]
    fn test_json_syntax_maps_to_invalid_json() {
        let err: OdrlError = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err().into();
        assert!(matches!(err, OdrlError::InvalidJson(_)));
    }

    #[test]
    fn test_message_names_path() {
        let err = OdrlError::UnknownOperator {
            path: "permission[1].constraint".into(),
            value: "before".into(),
        };
        assert_eq!(err.to_string(), "Unknown operator 'before' at permission[1].constraint");
    }
}
