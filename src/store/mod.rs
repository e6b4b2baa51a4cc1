pub mod file;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::cli::Args;
use crate::llm::GenerationMode;

/// Write-only key/value sink standing in for the survey's Embedded Data.
/// Values are kept for export; nothing in a session reads them back.
#[async_trait]
pub trait EmbeddedDataStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Names of the Embedded Data fields a session writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDataKeys {
    pub user_input: String,
    pub response: String,
    /// Only written in multi-turn mode.
    pub history: Option<String>,
}

impl EmbeddedDataKeys {
    pub fn for_mode(mode: GenerationMode) -> Self {
        match mode {
            GenerationMode::Single =>
                Self {
                    user_input: "userInput".to_string(),
                    response: "geminiResponse".to_string(),
                    history: None,
                },
            GenerationMode::Multi =>
                Self {
                    user_input: "lastUserInput".to_string(),
                    response: "lastGeminiResponse".to_string(),
                    history: Some("fullConversationHistory".to_string()),
                },
        }
    }

    pub fn from_args(args: &Args, mode: GenerationMode) -> Self {
        let mut keys = Self::for_mode(mode);
        if let Some(key) = args.user_input_key.as_ref().filter(|k| !k.trim().is_empty()) {
            keys.user_input = key.clone();
        }
        if let Some(key) = args.response_key.as_ref().filter(|k| !k.trim().is_empty()) {
            keys.response = key.clone();
        }
        if mode == GenerationMode::Multi {
            if let Some(key) = args.history_key.as_ref().filter(|k| !k.trim().is_empty()) {
                keys.history = Some(key.clone());
            }
        }
        keys
    }
}

pub fn create_embedded_store(
    args: &Args,
    session_id: &str
) -> Result<Arc<dyn EmbeddedDataStore>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(memory::MemoryStore::new())),
        "file" => {
            let store = file::JsonFileStore::new(&args.store_path);
            Ok(Arc::new(store))
        }
        "redis" => {
            let store = redis::RedisStore::new(&args.store_redis_url, &args.store_redis_prefix, session_id)?;
            Ok(Arc::new(store))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported embedded data store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_embedded_store(
    args: &Args,
    session_id: &str
) -> Result<Arc<dyn EmbeddedDataStore>, Box<dyn Error + Send + Sync>> {
    info!("Embedded data will be written to: {}", args.store_type);
    create_embedded_store(args, session_id)
}
