pub mod cli;
pub mod error;
pub mod llm;
pub mod models;
pub mod session;
pub mod speech;
pub mod store;

use cli::Args;
use llm::chat::http::HttpGeneratorClient;
use llm::{ BackendConfig, EmptyInputPolicy, GenerationMode };
use log::{ info, warn };
use session::{ ConversationSession, SessionConfig };
use speech::jsonl::JsonLinesTranscriptSource;
use speech::{ SpeechRecorder, TranscriptSource };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use store::{ initialize_embedded_store, EmbeddedDataKeys };
use tokio::io::BufReader;
use uuid::Uuid;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mode: GenerationMode = args.mode.parse()?;
    let empty_input: EmptyInputPolicy = args.empty_input.parse()?;
    let timeout = match args.request_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    info!("--- Core Configuration ---");
    info!("Backend URL: {}", args.backend_url);
    info!("Generation Mode: {}", mode);
    info!("Empty Input Policy: {}", empty_input);
    info!("Request Timeout: {:?}", timeout);
    info!("Embedded Data Store: {}", args.store_type);
    info!("Speech Events: {}", args.speech_events.as_deref().unwrap_or("disabled"));
    info!("-------------------------");

    let mut backend = BackendConfig::new(&args.backend_url, mode, timeout)?;
    if args.no_proxy {
        backend = backend.without_proxy();
    }
    let client = Arc::new(HttpGeneratorClient::from_config(&backend)?);

    if args.check_health {
        match client.health().await {
            Ok(true) => info!("Backend health check passed"),
            Ok(false) => warn!("Backend health check reported an unhealthy service"),
            Err(e) => warn!("Backend health check failed: {}", e),
        }
    }

    let session_id = Uuid::new_v4();
    let store = initialize_embedded_store(&args, &session_id.to_string())?;
    let config = SessionConfig {
        mode,
        empty_input,
        keys: EmbeddedDataKeys::from_args(&args, mode),
    };
    let session = ConversationSession::with_id(session_id, config, client, store);

    match &args.speech_events {
        Some(path) => {
            let source: Arc<dyn TranscriptSource> = Arc::new(JsonLinesTranscriptSource::new(path));
            let mut recorder = SpeechRecorder::new(Some(source));
            cli::runner::run_speech(&session, &mut recorder, tokio::io::stdout()).await?;
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            cli::runner::run_typed(&session, stdin, tokio::io::stdout()).await?;
        }
    }

    info!("Session {} finished with {} turns", session.id(), session.history().len());
    Ok(())
}
