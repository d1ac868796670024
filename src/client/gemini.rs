// Google Generative Language (Gemini) REST backend

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{prompt, ContentClient};
use crate::config::ClientConfig;
use crate::error::{Result, SeoError};
use crate::record::Language;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationParams,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: String,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

/// Error envelope returned by the API on non-success statuses
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// Whether a failed response means the credential itself was refused.
///
/// Besides 401/403, an invalid key comes back as 400 with reason `API_KEY_INVALID`.
fn is_credential_rejection(status: StatusCode, body: &str) -> bool {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return true;
    }
    if status != StatusCode::BAD_REQUEST {
        return false;
    }
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(response) => response
            .error
            .details
            .iter()
            .any(|detail| detail.reason.as_deref() == Some("API_KEY_INVALID")),
        Err(_) => body.contains("API_KEY_INVALID"),
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    config: ClientConfig,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: ClientConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("seogen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SeoError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!("Gemini client ready - model: {}", config.model);
        Ok(Self { client, config, api_key })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(&self, prompt: String) -> GenerateRequest {
        GenerateRequest {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationParams {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
                max_output_tokens: self.config.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect(),
        }
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> std::result::Result<String, String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| "response contained no candidates".to_string())?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(format!(
            "empty candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ));
    }
    Ok(text)
}

#[async_trait]
impl ContentClient for GeminiClient {
    fn identifier(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, identifier: &str, content: &str, language: Language) -> Result<String> {
        let generation_error = |message: String| SeoError::Generation {
            identifier: identifier.to_string(),
            language,
            message,
        };

        let prompt = prompt::build_prompt(identifier, content, language, self.config.max_source_chars);
        let request = self.build_request(prompt);
        let url = self.url();

        debug!("Sending generation request for {} ({}) to {}", identifier, language, url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| generation_error(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if is_credential_rejection(status, &error_text) {
                return Err(SeoError::Configuration(format!(
                    "API key rejected ({}): {}",
                    status, error_text
                )));
            }
            return Err(generation_error(format!("API error {}: {}", status, error_text)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| generation_error(format!("Failed to decode response: {}", e)))?;

        let text = extract_text(body).map_err(generation_error)?;
        debug!("Raw response for {} ({}): {} chars", identifier, language, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const INVALID_KEY_BODY: &str = r#"{
  "error": {
    "code": 400,
    "message": "API key not valid. Please pass a valid API key.",
    "status": "INVALID_ARGUMENT",
    "details": [
      {
        "@type": "type.googleapis.com/google.rpc.ErrorInfo",
        "reason": "API_KEY_INVALID",
        "domain": "googleapis.com",
        "metadata": {"service": "generativelanguage.googleapis.com"}
      }
    ]
  }
}"#;

    /// Serve a single canned HTTP response and return the endpoint to reach it
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}", addr)
    }

    fn client_for(endpoint: String) -> GeminiClient {
        let mut config = ClientConfig::default();
        config.endpoint = endpoint;
        GeminiClient {
            client: Client::builder().no_proxy().build().unwrap(),
            config,
            api_key: "bad-key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_invalid_key_response_is_fatal() {
        let endpoint = serve_once("400 Bad Request", INVALID_KEY_BODY).await;
        let err = client_for(endpoint)
            .generate("a", "transcript", Language::Chinese)
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::Configuration(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_server_error_fails_only_the_item() {
        let endpoint = serve_once("500 Internal Server Error", r#"{"error":{"code":500}}"#).await;
        let err = client_for(endpoint)
            .generate("a", "transcript", Language::English)
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::Generation { ref identifier, .. } if identifier == "a"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_credential_rejection_classification() {
        assert!(is_credential_rejection(StatusCode::UNAUTHORIZED, ""));
        assert!(is_credential_rejection(StatusCode::FORBIDDEN, "denied"));
        assert!(is_credential_rejection(StatusCode::BAD_REQUEST, INVALID_KEY_BODY));
        assert!(is_credential_rejection(StatusCode::BAD_REQUEST, "<html>API_KEY_INVALID</html>"));
        assert!(!is_credential_rejection(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"status":"INVALID_ARGUMENT","details":[{"reason":"BAD_REQUEST"}]}}"#
        ));
        assert!(!is_credential_rejection(StatusCode::TOO_MANY_REQUESTS, INVALID_KEY_BODY));
    }

    fn client() -> GeminiClient {
        GeminiClient::new(ClientConfig::default(), "key".to_string()).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let request = client().build_request("hello".to_string());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(value["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn test_url_uses_model() {
        let mut config = ClientConfig::default();
        config.endpoint = "http://localhost:8080/".to_string();
        config.model = "test-model".to_string();
        let client = GeminiClient::new(config, "key".to_string()).unwrap();
        assert_eq!(
            client.url(),
            "http://localhost:8080/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"title\":"},{"text":"\"T\"}"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "{\"title\":\"T\"}");
    }

    #[test]
    fn test_extract_text_rejects_empty() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(response).is_err());

        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        let err = extract_text(response).unwrap_err();
        assert!(err.contains("SAFETY"));
    }
}
