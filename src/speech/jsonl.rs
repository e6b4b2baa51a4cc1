use async_trait::async_trait;
use futures::{ future, StreamExt };
use log::warn;
use std::path::{ Path, PathBuf };
use tokio::fs::File;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio_stream::wrappers::LinesStream;
use super::{ Recognition, TranscriptEvent, TranscriptSource };
use crate::error::SubmitError;

/// Replays recognition events recorded one JSON object per line, e.g.
/// `{"type":"final","text":"Hello"}`. Each `start` reads the file from the top.
/// A replay has nothing left to capture, so stopping it only waits for the
/// recorded `end`.
pub struct JsonLinesTranscriptSource {
    path: PathBuf,
}

impl JsonLinesTranscriptSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

pub fn parse_event_line(line: &str) -> Option<TranscriptEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<TranscriptEvent>(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping malformed transcript event '{}': {}", line, e);
            None
        }
    }
}

#[async_trait]
impl TranscriptSource for JsonLinesTranscriptSource {
    async fn start(&self) -> Result<Recognition, SubmitError> {
        let file = File::open(&self.path).await.map_err(|e| {
            SubmitError::CapabilityUnavailable(
                format!("Could not open transcript events '{}': {}", self.path.display(), e)
            )
        })?;
        let lines = LinesStream::new(BufReader::new(file).lines());
        let events = lines.filter_map(|line| {
            let event = match line {
                Ok(text) => parse_event_line(&text),
                Err(e) => {
                    warn!("Failed reading transcript events: {}", e);
                    None
                }
            };
            future::ready(event)
        });
        Ok(Recognition::new(Box::pin(events)))
    }
}
