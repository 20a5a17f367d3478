use crate::config::{AnalysisConfig, ApiKey};
use crate::error::{AppError, Result};
use log;
use serde::Deserialize;
use std::time::Duration;

/// System instruction sent with every analysis request.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert code reviewer and linter. \
Analyze the following multi-language codebase provided below. Identify high-level, \
cross-file patterns, potential areas for refactoring, and inconsistencies in coding \
style or logic. Do not suggest trivial fixes. Focus on architectural improvements \
or repeated code that could be abstracted. Provide 3-5 actionable suggestions. For \
each suggestion, specify the relevant file(s) and provide a clear explanation of \
the issue and your proposed improvement.";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The narrow seam to the AI backend: opaque text in, opaque text out.
/// Everything upstream of this trait is testable without network access.
pub trait AnalysisBackend {
    fn send(&self, payload: &str) -> Result<String>;
}

/// Blocking client for the Gemini generateContent endpoint.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
    probe_model: String,
    temperature: f32,
    api_key: ApiKey,
}

impl GeminiClient {
    pub fn new(config: &AnalysisConfig, api_key: ApiKey) -> Result<Self> {
        let timeout = config.request_timeout()?;
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            probe_model: config.probe_model.clone(),
            temperature: config.temperature,
            api_key,
        })
    }

    /// Probe the credential with a small request against the cheap model.
    pub fn validate_key(&self) -> Result<()> {
        let body = serde_json::json!({
            "contents": [
                { "parts": [{ "text": "Reply with 'API key is working' if you receive this message." }] }
            ]
        });
        self.generate(&self.probe_model, body).map(|_| ())
    }

    fn generate(&self, model: &str, body: serde_json::Value) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            model,
            self.api_key.as_str()
        );
        log::debug!("Sending generateContent request to model '{}'...", model);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("Request to model '{}' timed out", model))
                } else {
                    AppError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(AppError::Api(format!("{}: {}", status, error_text)));
        }

        let api_response: GenerateResponse = response
            .json()
            .map_err(|e| AppError::Api(format!("Failed to parse Gemini response: {}", e)))?;

        let text = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AppError::Api("No candidates in Gemini response".to_string()))?;

        log::debug!("Received {} bytes of analysis text.", text.len());
        Ok(text)
    }
}

impl AnalysisBackend for GeminiClient {
    fn send(&self, payload: &str) -> Result<String> {
        let body = serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [
                { "parts": [{ "text": format!("Codebase: {}", payload) }] }
            ],
            "generationConfig": {
                "temperature": self.temperature
            }
        });
        self.generate(&self.model, body)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn client_for(server: &mockito::ServerGuard, model: &str) -> GeminiClient {
        let config = AnalysisConfig {
            model: model.to_string(),
            base_url: server.url(),
            timeout: "5s".to_string(),
            ..AnalysisConfig::default()
        };
        GeminiClient::new(&config, ApiKey::new("test-key")).unwrap()
    }

    #[test]
    fn send_extracts_first_candidate_text() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/models/test-model:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"Suggestion one."}]}}]}"#,
            )
            .create();

        let client = client_for(&server, "test-model");
        let text = client.send("fn main() {}").unwrap();

        assert_eq!(text, "Suggestion one.");
        mock.assert();
    }

    #[test]
    fn non_success_status_is_an_api_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/models/test-model:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error":{"message":"quota exceeded"}}"#)
            .create();

        let client = client_for(&server, "test-model");
        let result = client.send("payload");

        match result {
            Err(AppError::Api(msg)) => assert!(msg.contains("quota exceeded")),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn empty_candidate_list_is_an_api_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/models/test-model:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create();

        let client = client_for(&server, "test-model");
        assert!(matches!(client.send("payload"), Err(AppError::Api(_))));
    }

    #[test]
    fn validate_key_hits_the_probe_model() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/models/probe-model:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"API key is working"}]}}]}"#)
            .create();

        let config = AnalysisConfig {
            probe_model: "probe-model".to_string(),
            base_url: server.url(),
            timeout: "5s".to_string(),
            ..AnalysisConfig::default()
        };
        let client = GeminiClient::new(&config, ApiKey::new("test-key")).unwrap();

        client.validate_key().unwrap();
        mock.assert();
    }
}
