use serde_json::{ json, Value };
use std::sync::Arc;
use std::time::Duration;
use survey_genai::error::SubmitError;
use survey_genai::llm::chat::http::HttpGeneratorClient;
use survey_genai::llm::{ BackendConfig, EmptyInputPolicy, GenerationMode };
use survey_genai::session::{ ConversationSession, Reply, SessionConfig };
use survey_genai::store::memory::MemoryStore;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::net::{ TcpListener, TcpStream };
use tokio::task::JoinHandle;

struct CapturedRequest {
    head: String,
    body: String,
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= pos + 4 + content_length {
                let body = String::from_utf8_lossy(&buf[pos + 4..pos + 4 + content_length]).to_string();
                return CapturedRequest { head, body };
            }
        }
    }
    CapturedRequest { head: String::from_utf8_lossy(&buf).to_string(), body: String::new() }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Answers `responses.len()` connections in order with canned replies and
/// hands back what each request carried.
async fn serve(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<CapturedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            captured.push(read_request(&mut socket).await);
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
        captured
    });
    (format!("http://{}/generate", addr), handle)
}

fn session_for(url: &str, mode: GenerationMode, timeout: Option<Duration>) -> (ConversationSession, Arc<MemoryStore>) {
    let backend = BackendConfig::new(url, mode, timeout).unwrap().without_proxy();
    let client = Arc::new(HttpGeneratorClient::from_config(&backend).unwrap());
    let store = Arc::new(MemoryStore::new());
    let session = ConversationSession::new(
        SessionConfig::new(mode, EmptyInputPolicy::Block),
        client,
        store.clone()
    );
    (session, store)
}

#[tokio::test]
async fn test_multi_turn_conversation_over_http() {
    let (url, server) = serve(
        vec![
            ("200 OK", json!({ "generated_text": "Hi there" }).to_string()),
            ("200 OK", json!({ "generated_text": "Doing well" }).to_string())
        ]
    ).await;
    let (session, store) = session_for(&url, GenerationMode::Multi, Some(Duration::from_secs(5)));

    assert_eq!(session.submit("Hello").await, Ok(Reply::Generated("Hi there".to_string())));
    assert_eq!(session.submit("How are you?").await, Ok(Reply::Generated("Doing well".to_string())));

    let captured = server.await.unwrap();
    assert!(captured[0].head.starts_with("POST /generate"));
    assert!(captured[0].head.to_lowercase().contains("content-type: application/json"));

    let second: Value = serde_json::from_str(&captured[1].body).unwrap();
    assert_eq!(
        second,
        json!({
            "history": [
                { "role": "user", "parts": [{ "text": "Hello" }] },
                { "role": "model", "parts": [{ "text": "Hi there" }] },
                { "role": "user", "parts": [{ "text": "How are you?" }] }
            ]
        })
    );
    assert_eq!(store.get("lastGeminiResponse").as_deref(), Some("Doing well"));
}

#[tokio::test]
async fn test_single_turn_sends_prompt_only() {
    let (url, server) = serve(vec![("200 OK", json!({ "generated_text": "Sure" }).to_string())]).await;
    let (session, _) = session_for(&url, GenerationMode::Single, None);

    session.submit("Plan a trip").await.unwrap();

    let captured = server.await.unwrap();
    let body: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(body, json!({ "prompt": "Plan a trip" }));
}

#[tokio::test]
async fn test_server_error_surfaces_backend_message() {
    let (url, server) = serve(
        vec![("500 Internal Server Error", json!({ "error": "rate limited" }).to_string())]
    ).await;
    let (session, _) = session_for(&url, GenerationMode::Multi, Some(Duration::from_secs(5)));

    let err = session.submit("Hello").await.unwrap_err();
    assert!(matches!(err, SubmitError::Network(_)));
    assert!(err.display_message().contains("rate limited"));
    assert_eq!(session.history().len(), 1);
    assert!(!session.is_submitting());
    server.await.unwrap();
}

#[tokio::test]
async fn test_empty_success_body_is_logic_error() {
    let (url, server) = serve(vec![("200 OK", "{}".to_string())]).await;
    let (session, _) = session_for(&url, GenerationMode::Multi, Some(Duration::from_secs(5)));

    let err = session.submit("Hello").await.unwrap_err();
    assert!(matches!(err, SubmitError::BackendLogic(_)));
    assert_eq!(session.history().len(), 1);
    server.await.unwrap();
}

#[tokio::test]
async fn test_hung_backend_times_out_and_releases_guard() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/generate", listener.local_addr().unwrap());
    let hold = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });
    let (session, _) = session_for(&url, GenerationMode::Multi, Some(Duration::from_millis(200)));

    let err = session.submit("Hello").await.unwrap_err();
    assert!(matches!(err, SubmitError::Network(_)));
    assert!(!session.is_submitting());
    hold.abort();
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/generate", listener.local_addr().unwrap());
    drop(listener);
    let (session, store) = session_for(&url, GenerationMode::Single, Some(Duration::from_secs(2)));

    let err = session.submit("Hello").await.unwrap_err();
    assert!(matches!(err, SubmitError::Network(_)));
    assert!(store.get("geminiResponse").unwrap().starts_with("Error: Failed to communicate with backend."));
}

#[tokio::test]
async fn test_health_probe() {
    let (url, server) = serve(vec![("200 OK", json!({ "status": "ok" }).to_string())]).await;
    let backend = BackendConfig::new(&url, GenerationMode::Multi, Some(Duration::from_secs(5)))
        .unwrap()
        .without_proxy();
    let client = HttpGeneratorClient::from_config(&backend).unwrap();

    assert!(client.health().await.unwrap());
    let captured = server.await.unwrap();
    assert!(captured[0].head.starts_with("GET /health"));
}
