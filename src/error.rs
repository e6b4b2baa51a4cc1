use thiserror::Error;

pub const UNEXPECTED_RESPONSE: &str = "Received unexpected response structure from backend.";

/// Every way a submit can end without a generated reply. All variants are
/// recoverable; the session stays usable after any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Please enter some text before submitting.")]
    EmptyInput,

    #[error("{0}")]
    BackendLogic(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    CapabilityUnavailable(String),

    #[error("A submission is already in progress.")]
    Busy,
}

impl SubmitError {
    /// Inline status string shown next to the input control.
    pub fn display_message(&self) -> String {
        match self {
            SubmitError::EmptyInput | SubmitError::Busy => self.to_string(),
            SubmitError::BackendLogic(msg) => format!("Error: {}", msg),
            SubmitError::Network(msg) => {
                format!("Error: Could not communicate with the generation service. {}", msg)
            }
            SubmitError::CapabilityUnavailable(msg) => msg.clone(),
        }
    }

    /// Value written to the response key of the audit store.
    pub fn audit_value(&self) -> String {
        match self {
            SubmitError::Network(msg) => {
                format!("Error: Failed to communicate with backend. {}", msg)
            }
            other => format!("Error: {}", other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported backend URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_logic_message_is_prefixed() {
        let err = SubmitError::BackendLogic("rate limited".to_string());
        assert_eq!(err.display_message(), "Error: rate limited");
        assert_eq!(err.audit_value(), "Error: rate limited");
    }

    #[test]
    fn test_network_message_keeps_diagnostic() {
        let err = SubmitError::Network("timed out".to_string());
        assert!(err.display_message().ends_with("timed out"));
        assert_eq!(err.audit_value(), "Error: Failed to communicate with backend. timed out");
    }

    #[test]
    fn test_empty_input_message() {
        assert_eq!(
            SubmitError::EmptyInput.display_message(),
            "Please enter some text before submitting."
        );
    }
}
