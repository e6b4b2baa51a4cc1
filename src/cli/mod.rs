pub mod runner;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Full URL of the generation endpoint (e.g., https://example.herokuapp.com/generate)
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: String,

    /// Request shape: "single" sends {"prompt"}, "multi" sends the whole {"history"}
    #[arg(long, env = "GENERATION_MODE", default_value = "multi")]
    pub mode: String,

    /// What to do with blank input (block, pass-through)
    #[arg(long, env = "EMPTY_INPUT_POLICY", default_value = "block")]
    pub empty_input: String,

    /// Seconds to wait for the backend before giving up. 0 waits forever.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,

    /// Connect to the backend directly, ignoring HTTP(S)_PROXY settings
    #[arg(long, env = "NO_PROXY_BACKEND", default_value = "false")]
    pub no_proxy: bool,

    /// Probe the backend's /health route before the first submit
    #[arg(long, env = "CHECK_HEALTH", default_value = "false")]
    pub check_health: bool,

    // --- Embedded Data Args ---
    /// Where mirrored values go (memory, file, redis)
    #[arg(long, env = "STORE_TYPE", default_value = "memory")]
    pub store_type: String,

    /// JSON export path for the file store.
    #[arg(long, env = "STORE_PATH", default_value = "embedded_data.json")]
    pub store_path: String,

    /// Redis URL for the redis store.
    #[arg(long, env = "STORE_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub store_redis_url: String,

    /// Prefix of the per-session Redis hash key.
    #[arg(long, env = "STORE_REDIS_PREFIX", default_value = "embedded:")]
    pub store_redis_prefix: String,

    /// Override for the user input key (default: userInput / lastUserInput)
    #[arg(long, env = "USER_INPUT_KEY")]
    pub user_input_key: Option<String>,

    /// Override for the response key (default: geminiResponse / lastGeminiResponse)
    #[arg(long, env = "RESPONSE_KEY")]
    pub response_key: Option<String>,

    /// Override for the history key, multi-turn only (default: fullConversationHistory)
    #[arg(long, env = "HISTORY_KEY")]
    pub history_key: Option<String>,

    // --- Input Args ---
    /// JSON-lines file of speech recognition events. When set, input comes
    /// from the recorded transcript instead of stdin.
    #[arg(long, env = "SPEECH_EVENTS")]
    pub speech_events: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["survey-genai", "--backend-url", "http://localhost:5001/generate"]);
        assert_eq!(args.mode, "multi");
        assert_eq!(args.empty_input, "block");
        assert_eq!(args.request_timeout_secs, 60);
        assert_eq!(args.store_type, "memory");
        assert!(args.speech_events.is_none());
        assert!(!args.check_health);
    }

    #[test]
    fn test_backend_url_is_required() {
        let command = Args::command();
        let backend_url = command
            .get_arguments()
            .find(|arg| arg.get_id() == "backend_url")
            .expect("backend_url argument");
        assert!(backend_url.is_required_set());
        assert_eq!(backend_url.get_env(), Some(std::ffi::OsStr::new("BACKEND_URL")));
    }
}
