use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;
use super::EmbeddedDataStore;

/// Keeps the latest value per key plus the ordered write log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, String>,
    writes: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|state| state.values.get(key).cloned())
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .map(|state| state.writes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddedDataStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut state = self.inner.lock().map_err(|_| "memory store lock poisoned")?;
        state.values.insert(key.to_string(), value.to_string());
        state.writes.push((key.to_string(), value.to_string()));
        Ok(())
    }
}
