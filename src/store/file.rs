use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde::{ Deserialize, Serialize };
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{ Path, PathBuf };
use tokio::sync::Mutex;
use super::EmbeddedDataStore;

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct StoredExport {
    pub values: BTreeMap<String, String>,
    pub updated_at: Option<String>,
}

/// Writes every value into a single JSON document, rewritten on each set.
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<Option<StoredExport>>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(None),
        }
    }

    async fn load(&self) -> Result<StoredExport, Box<dyn Error + Send + Sync>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json_str) => Ok(serde_json::from_str(&json_str)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredExport::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl EmbeddedDataStore for JsonFileStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let export = guard.get_or_insert_with(StoredExport::default);
        export.values.insert(key.to_string(), value.to_string());
        export.updated_at = Some(Utc::now().to_rfc3339());

        let json = serde_json::to_string_pretty(&*export)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Embedded data '{}' written to {}", key, self.path.display());
        Ok(())
    }
}
