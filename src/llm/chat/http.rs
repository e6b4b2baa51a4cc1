use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::error::Error as StdError;
use url::Url;
use log::{ debug, info, warn };

use super::{ classify_response, GeneratorClient };
use crate::error::{ ConfigError, SubmitError };
use crate::llm::BackendConfig;
use crate::models::chat::GenerateRequest;

#[derive(Deserialize, Debug)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Clone)]
pub struct HttpGeneratorClient {
    http: HttpClient,
    url: Url,
    health_url: Url,
}

impl HttpGeneratorClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, ConfigError> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        info!(
            "HttpGeneratorClient configured → url={} mode={} timeout={:?}",
            config.url,
            config.mode,
            config.timeout
        );

        Ok(Self {
            http,
            url: config.url.clone(),
            health_url: config.health_url(),
        })
    }

    /// Probes the backend's `/health` route. `Ok(true)` only for a 2xx reply
    /// whose body reports `"status": "ok"`.
    pub async fn health(&self) -> Result<bool, Box<dyn StdError + Send + Sync>> {
        let resp = self.http.get(self.health_url.clone()).send().await?;
        if !resp.status().is_success() {
            warn!("Health check at {} returned {}", self.health_url, resp.status());
            return Ok(false);
        }
        let data = resp.json::<HealthResponse>().await?;
        Ok(data.status.eq_ignore_ascii_case("ok"))
    }
}

#[async_trait]
impl GeneratorClient for HttpGeneratorClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, SubmitError> {
        match request {
            GenerateRequest::Prompt { prompt } => {
                debug!("POST {} prompt ({} chars)", self.url, prompt.len());
            }
            GenerateRequest::History { history } => {
                debug!("POST {} history ({} turns)", self.url, history.len());
            }
        }

        let resp = self.http
            .post(self.url.clone())
            .json(request)
            .send().await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| SubmitError::Network(e.to_string()))?;
        debug!("Backend replied {} ({} bytes)", status, body.len());

        classify_response(status, &body)
    }

    fn endpoint(&self) -> String {
        self.url.to_string()
    }
}
