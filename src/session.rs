use crate::error::SubmitError;
use crate::llm::chat::GeneratorClient;
use crate::llm::{ EmptyInputPolicy, GenerationMode };
use crate::models::chat::{ ConversationHistory, GenerateRequest, Turn };
use crate::store::{ EmbeddedDataKeys, EmbeddedDataStore };

use log::{ debug, info, warn };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::{ Arc, Mutex, MutexGuard };
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: GenerationMode,
    pub empty_input: EmptyInputPolicy,
    pub keys: EmbeddedDataKeys,
}

impl SessionConfig {
    pub fn new(mode: GenerationMode, empty_input: EmptyInputPolicy) -> Self {
        Self {
            mode,
            empty_input,
            keys: EmbeddedDataKeys::for_mode(mode),
        }
    }
}

/// Whether the control that triggers a submit may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Ready,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Generated(String),
    /// Blank input under the pass-through policy: nothing was sent and the
    /// caller may move on.
    Skipped,
}

/// One conversation with the generator, owned by a single page or question.
/// At most one submit is outstanding at a time.
pub struct ConversationSession {
    id: Uuid,
    config: SessionConfig,
    client: Arc<dyn GeneratorClient>,
    store: Arc<dyn EmbeddedDataStore>,
    history: Mutex<ConversationHistory>,
    in_flight: AtomicBool,
    controls: watch::Sender<ControlState>,
}

/// Held for the duration of one submit; dropping it re-enables the control.
struct InFlightGuard<'a> {
    session: &'a ConversationSession,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.store(false, Ordering::Release);
        self.session.controls.send_replace(ControlState::Ready);
        debug!("Session {} ready for input", self.session.id);
    }
}

impl ConversationSession {
    pub fn new(
        config: SessionConfig,
        client: Arc<dyn GeneratorClient>,
        store: Arc<dyn EmbeddedDataStore>
    ) -> Self {
        Self::with_id(Uuid::new_v4(), config, client, store)
    }

    pub fn with_id(
        id: Uuid,
        config: SessionConfig,
        client: Arc<dyn GeneratorClient>,
        store: Arc<dyn EmbeddedDataStore>
    ) -> Self {
        let (controls, _) = watch::channel(ControlState::Ready);
        info!(
            "Session {} created → mode={} empty_input={} endpoint={}",
            id,
            config.mode,
            config.empty_input,
            client.endpoint()
        );
        Self {
            id,
            config,
            client,
            store,
            history: Mutex::new(ConversationHistory::new()),
            in_flight: AtomicBool::new(false),
            controls,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> ConversationHistory {
        self.lock_history().clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.controls.subscribe()
    }

    /// Appends `input` as a user turn, sends one request and, if the backend
    /// produced text, appends it as a model turn.
    pub async fn submit(&self, input: &str) -> Result<Reply, SubmitError> {
        let input = input.trim();
        if input.is_empty() {
            return self.handle_empty_input().await;
        }

        let _guard = self.begin_submit()?;

        let (request, history_json) = {
            let mut history = self.lock_history();
            history.push(Turn::user(input));
            (self.build_request(&history, input), self.history_json(&history))
        };
        self.mirror(&self.config.keys.user_input, input).await;
        self.mirror_history(history_json).await;

        debug!("Session {} submitting to {}", self.id, self.client.endpoint());
        match self.client.generate(&request).await {
            Ok(text) => {
                let history_json = {
                    let mut history = self.lock_history();
                    history.push(Turn::model(text.clone()));
                    self.history_json(&history)
                };
                info!("Session {} received {} chars from backend", self.id, text.len());
                self.mirror(&self.config.keys.response, &text).await;
                self.mirror_history(history_json).await;
                Ok(Reply::Generated(text))
            }
            Err(err) => {
                warn!("Session {} submit failed: {}", self.id, err);
                self.mirror(&self.config.keys.response, &err.audit_value()).await;
                Err(err)
            }
        }
    }

    async fn handle_empty_input(&self) -> Result<Reply, SubmitError> {
        match self.config.empty_input {
            EmptyInputPolicy::Block => {
                warn!("Session {} declined empty input", self.id);
                Err(SubmitError::EmptyInput)
            }
            EmptyInputPolicy::PassThrough => {
                info!("Session {} passing through empty input", self.id);
                self.mirror(&self.config.keys.user_input, "").await;
                self.mirror(&self.config.keys.response, "").await;
                Ok(Reply::Skipped)
            }
        }
    }

    fn begin_submit(&self) -> Result<InFlightGuard<'_>, SubmitError> {
        if self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Session {} rejected submit: another request is in flight", self.id);
            return Err(SubmitError::Busy);
        }
        self.controls.send_replace(ControlState::Submitting);
        Ok(InFlightGuard { session: self })
    }

    fn build_request(&self, history: &ConversationHistory, input: &str) -> GenerateRequest {
        match self.config.mode {
            GenerationMode::Single => GenerateRequest::Prompt { prompt: input.to_string() },
            GenerationMode::Multi => GenerateRequest::History { history: history.to_wire() },
        }
    }

    fn history_json(&self, history: &ConversationHistory) -> Option<String> {
        if self.config.keys.history.is_none() {
            return None;
        }
        match history.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("Session {} could not serialize history: {}", self.id, e);
                None
            }
        }
    }

    async fn mirror_history(&self, history_json: Option<String>) {
        if let (Some(key), Some(json)) = (self.config.keys.history.as_ref(), history_json) {
            self.mirror(key, &json).await;
        }
    }

    async fn mirror(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value).await {
            warn!("Session {} failed to store embedded data '{}': {}", self.id, key, e);
        }
    }

    fn lock_history(&self) -> MutexGuard<'_, ConversationHistory> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
