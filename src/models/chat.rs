use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// One message of the dialogue. Fields are private so a turn cannot be edited
/// after it has been pushed into a history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only, chronologically ordered list of turns for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn to_wire(&self) -> Vec<WireTurn> {
        self.turns.iter().map(WireTurn::from).collect()
    }

    /// JSON form of the history as written to the audit store.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_wire())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePart {
    pub text: String,
}

/// Turn as sent to the backend: `{"role": "...", "parts": [{"text": "..."}]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTurn {
    pub role: Role,
    pub parts: Vec<WirePart>,
}

impl From<&Turn> for WireTurn {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            parts: vec![WirePart { text: turn.text.clone() }],
        }
    }
}

impl WireTurn {
    pub fn into_turn(self) -> Turn {
        let text = self.parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        Turn { role: self.role, text }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerateRequest {
    Prompt {
        prompt: String,
    },
    History {
        history: Vec<WireTurn>,
    },
}

/// Backend reply. Fields of an unexpected type never fail the parse: a
/// non-string `generated_text` counts as missing and any other truthy
/// `error` is kept as its JSON text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateResponse {
    #[serde(default, deserialize_with = "string_only")]
    pub generated_text: Option<String>,
    #[serde(default, deserialize_with = "truthy_text")]
    pub error: Option<String>,
}

impl GenerateResponse {
    /// Reads a parsed body. Anything other than a JSON object carries no
    /// fields.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_default()
    }
}

fn string_only<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

fn truthy_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_serializes_with_parts() {
        let mut history = ConversationHistory::new();
        history.push(Turn::user("Hello"));
        history.push(Turn::model("Hi there"));

        let request = GenerateRequest::History { history: history.to_wire() };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "history": [
                    { "role": "user", "parts": [{ "text": "Hello" }] },
                    { "role": "model", "parts": [{ "text": "Hi there" }] }
                ]
            })
        );
    }

    #[test]
    fn test_prompt_request_shape() {
        let request = GenerateRequest::Prompt { prompt: "Hello".to_string() };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "prompt": "Hello" }));
    }

    #[test]
    fn test_response_accepts_partial_bodies() {
        let ok: GenerateResponse = serde_json::from_str(r#"{"generated_text":"Hi"}"#).unwrap();
        assert_eq!(ok.generated_text.as_deref(), Some("Hi"));
        assert!(ok.error.is_none());

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, GenerateResponse::default());
    }

    #[test]
    fn test_response_tolerates_unexpected_field_types() {
        let numeric = GenerateResponse::from_value(json!({ "generated_text": 42 }));
        assert_eq!(numeric, GenerateResponse::default());

        let detailed = GenerateResponse::from_value(
            json!({ "generated_text": null, "error": { "code": 429 } })
        );
        assert_eq!(detailed.error.as_deref(), Some(r#"{"code":429}"#));

        assert_eq!(GenerateResponse::from_value(json!([])), GenerateResponse::default());
    }

    #[test]
    fn test_audit_json_parses_back_into_turns() {
        let mut history = ConversationHistory::new();
        history.push(Turn::user("Where should I go?"));
        history.push(Turn::model("Somewhere warm?"));

        let json = history.to_json().unwrap();
        let parsed: Vec<WireTurn> = serde_json::from_str(&json).unwrap();
        let turns: Vec<Turn> = parsed.into_iter().map(WireTurn::into_turn).collect();
        assert_eq!(turns, history.turns());
    }
}
