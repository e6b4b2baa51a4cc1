pub mod http;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use crate::error::{ SubmitError, UNEXPECTED_RESPONSE };
use crate::models::chat::{ GenerateRequest, GenerateResponse };

/// Seam between a session and the remote text generator. One call to
/// `generate` is one network request; implementations never retry.
#[async_trait]
pub trait GeneratorClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, SubmitError>;

    fn endpoint(&self) -> String;
}

/// Maps a finished HTTP exchange onto the submit outcome.
pub fn classify_response(status: StatusCode, body: &str) -> Result<String, SubmitError> {
    if !status.is_success() {
        let status_text = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_u16().to_string());
        let message = match serde_json::from_str::<Value>(body).map(GenerateResponse::from_value) {
            Ok(data) =>
                format!(
                    "Network response was not ok: {}. Backend Error: {}",
                    status_text,
                    data.error.as_deref().unwrap_or("Unknown error")
                ),
            Err(_) =>
                format!(
                    "Network response was not ok: {}. Could not parse error response.",
                    status_text
                ),
        };
        return Err(SubmitError::Network(message));
    }

    let value: Value = serde_json::from_str(body).map_err(|e|
        SubmitError::Network(format!("Invalid JSON in backend response: {}", e))
    )?;
    let data = GenerateResponse::from_value(value);

    if let Some(error) = data.error {
        return Err(SubmitError::BackendLogic(error));
    }

    match data.generated_text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(SubmitError::BackendLogic(UNEXPECTED_RESPONSE.to_string())),
    }
}
