pub mod jsonl;

use async_trait::async_trait;
use futures::{ Stream, StreamExt };
use log::{ debug, info, warn };
use serde::{ Deserialize, Serialize };
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;
use crate::error::SubmitError;

pub const UNAVAILABLE_MESSAGE: &str = "Speech recognition is not available.";

/// One notification from a speech-to-text capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TranscriptEvent {
    /// Provisional text that may still change; never submitted.
    Interim {
        text: String,
    },
    /// A finalized segment.
    Final {
        text: String,
    },
    Error {
        code: String,
    },
    /// The capability stopped listening normally.
    End,
}

pub type TranscriptStream = Pin<Box<dyn Stream<Item = TranscriptEvent> + Send>>;

/// One started recording. Firing `stop` asks the capability to stop
/// listening; it still delivers results for audio already captured and
/// then an `End` event.
pub struct Recognition {
    pub events: TranscriptStream,
    pub stop: Option<oneshot::Sender<()>>,
}

impl Recognition {
    /// A recording with no way to interrupt it; it runs until its own end.
    pub fn new(events: TranscriptStream) -> Self {
        Self { events, stop: None }
    }

    pub fn with_stop(events: TranscriptStream, stop: oneshot::Sender<()>) -> Self {
        Self { events, stop: Some(stop) }
    }
}

/// A speech capability that can be started any number of times. Each call
/// opens a fresh recording; dropping its stream abandons it.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn start(&self) -> Result<Recognition, SubmitError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    ServiceNotAllowed,
    Other(String),
}

impl RecognitionError {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => RecognitionError::NoSpeech,
            "audio-capture" => RecognitionError::AudioCapture,
            "not-allowed" => RecognitionError::NotAllowed,
            "network" => RecognitionError::Network,
            "service-not-allowed" => RecognitionError::ServiceNotAllowed,
            other => RecognitionError::Other(other.to_string()),
        }
    }

    pub fn message(&self) -> String {
        match self {
            RecognitionError::NoSpeech => "No speech detected initially. Please try again.".to_string(),
            RecognitionError::AudioCapture => "Error: Microphone not found or not permitted.".to_string(),
            RecognitionError::NotAllowed => "Error: Microphone access denied.".to_string(),
            RecognitionError::Network => "Network error during speech recognition.".to_string(),
            RecognitionError::ServiceNotAllowed =>
                "Speech service not allowed by browser/settings.".to_string(),
            RecognitionError::Other(code) => format!("Error during recognition: {}", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Unavailable,
    Idle,
    Recording,
    /// Stop was requested; finalized results still arrive until `End`.
    Stopping,
    Stopped,
}

/// Which speech affordances are usable right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechControls {
    pub start: bool,
    pub stop: bool,
    pub submit: bool,
}

pub struct SpeechRecorder {
    source: Option<Arc<dyn TranscriptSource>>,
    stream: Option<TranscriptStream>,
    stop_signal: Option<oneshot::Sender<()>>,
    state: RecorderState,
    transcript: String,
    status: String,
}

impl SpeechRecorder {
    pub fn new(source: Option<Arc<dyn TranscriptSource>>) -> Self {
        let (state, status) = match source {
            Some(_) => (RecorderState::Idle, "Click \"Start Recording\" to speak.".to_string()),
            None => {
                warn!("No speech capability available; speech controls disabled.");
                (RecorderState::Unavailable, UNAVAILABLE_MESSAGE.to_string())
            }
        };
        Self {
            source,
            stream: None,
            stop_signal: None,
            state,
            transcript: String::new(),
            status,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Finalized text so far, including the separator after each segment.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn controls(&self) -> SpeechControls {
        match self.state {
            RecorderState::Unavailable => SpeechControls { start: false, stop: false, submit: false },
            RecorderState::Idle => SpeechControls { start: true, stop: false, submit: false },
            RecorderState::Recording => SpeechControls { start: false, stop: true, submit: false },
            RecorderState::Stopping => SpeechControls { start: false, stop: false, submit: false },
            RecorderState::Stopped =>
                SpeechControls {
                    start: true,
                    stop: false,
                    submit: !self.transcript.trim().is_empty(),
                },
        }
    }

    /// Begins a new recording, discarding any earlier transcript.
    pub async fn start(&mut self) -> Result<(), SubmitError> {
        let source = match &self.source {
            Some(source) => Arc::clone(source),
            None => {
                return Err(SubmitError::CapabilityUnavailable(UNAVAILABLE_MESSAGE.to_string()));
            }
        };
        if self.is_listening() {
            debug!("Already recording.");
            return Ok(());
        }

        self.transcript.clear();
        match source.start().await {
            Ok(recognition) => {
                self.stream = Some(recognition.events);
                self.stop_signal = recognition.stop;
                self.state = RecorderState::Recording;
                self.status = "Recording... Click \"Stop Recording\" when done.".to_string();
                info!("Speech recognition started.");
                Ok(())
            }
            Err(e) => {
                self.state = RecorderState::Idle;
                self.status = "Could not start recording. Is microphone ready?".to_string();
                Err(e)
            }
        }
    }

    /// Asks the capability to stop listening. The recording stays open in
    /// `Stopping` so results for audio already heard still reach the
    /// transcript; keep polling until it ends.
    pub fn stop(&mut self) {
        if self.state != RecorderState::Recording {
            debug!("Stop requested but not recording.");
            return;
        }
        if let Some(signal) = self.stop_signal.take() {
            if signal.send(()).is_err() {
                debug!("Speech capability already finished listening.");
            }
        }
        self.state = RecorderState::Stopping;
        self.status = "Stopping...".to_string();
        info!("Speech recognition stop requested.");
    }

    /// Pulls the next event from the active recording. Returns `false` once
    /// the recording is over.
    pub async fn poll_event(&mut self) -> bool {
        let next = match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => {
                return false;
            }
        };
        match next {
            Some(event) => {
                self.apply(event);
                self.is_listening()
            }
            None => {
                self.release_stream();
                match self.state {
                    RecorderState::Recording => {
                        warn!("Speech stream closed without an end event.");
                        self.state = RecorderState::Idle;
                        self.status = "Recognition stopped unexpectedly. Try again.".to_string();
                    }
                    RecorderState::Stopping => self.finish_stopped(),
                    _ => {}
                }
                false
            }
        }
    }

    /// Consumes events until the capability ends or fails.
    pub async fn record_until_end(&mut self) {
        while self.poll_event().await {}
    }

    pub fn apply(&mut self, event: TranscriptEvent) {
        if !self.is_listening() {
            debug!("Ignoring speech event outside a recording: {:?}", event);
            return;
        }
        match event {
            TranscriptEvent::Interim { text } => {
                debug!("Interim transcript: {}", text);
            }
            TranscriptEvent::Final { text } => {
                if !text.is_empty() {
                    self.transcript.push_str(&text);
                    self.transcript.push(' ');
                    debug!("Accumulated final text: {}", self.transcript);
                }
            }
            TranscriptEvent::Error { code } => {
                let error = RecognitionError::from_code(&code);
                warn!("Speech recognition error: {}", code);
                self.release_stream();
                self.transcript.clear();
                self.state = RecorderState::Idle;
                self.status = error.message();
            }
            TranscriptEvent::End => {
                self.release_stream();
                self.finish_stopped();
            }
        }
    }

    /// Hands the finalized transcript to the caller for submission and
    /// resets the recorder for the next take.
    pub fn take_transcript(&mut self) -> Result<String, SubmitError> {
        match self.state {
            RecorderState::Unavailable => {
                Err(SubmitError::CapabilityUnavailable(UNAVAILABLE_MESSAGE.to_string()))
            }
            RecorderState::Stopped if !self.transcript.trim().is_empty() => {
                let text = self.transcript.trim().to_string();
                self.transcript.clear();
                self.state = RecorderState::Idle;
                self.status = "Processing submission...".to_string();
                Ok(text)
            }
            _ => {
                self.status = "Nothing to submit.".to_string();
                Err(SubmitError::EmptyInput)
            }
        }
    }

    fn is_listening(&self) -> bool {
        matches!(self.state, RecorderState::Recording | RecorderState::Stopping)
    }

    fn release_stream(&mut self) {
        self.stream = None;
        self.stop_signal = None;
    }

    fn finish_stopped(&mut self) {
        self.state = RecorderState::Stopped;
        self.status = if self.transcript.trim().is_empty() {
            "Recording stopped. No text captured. Click Start Recording.".to_string()
        } else {
            "Recording stopped. Click Submit or Start again.".to_string()
        };
        info!("Speech recognition stopped.");
    }
}
