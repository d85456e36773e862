//! Groq chat-completions client (OpenAI-compatible wire format).

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::stream::{StreamDecoder, StreamItem};
use super::ChatGateway;
use crate::error::{ErrorKind, GatewayError};
use crate::models::{ChatCompletion, ChatMessage, ChatRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Connection settings for [`GroqGateway`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(90),
        }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

/// HTTP gateway to the hosted Groq API.
pub struct GroqGateway {
    http: reqwest::Client,
    config: GroqConfig,
}

impl GroqGateway {
    pub fn new(config: GroqConfig) -> Result<Self, GatewayError> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::config(
                "GROQ_API_KEY is required to call the Groq API",
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, GatewayError> {
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::new(
                classify_status(status),
                format!("Groq API error {status}: {text}"),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatGateway for GroqGateway {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, GatewayError> {
        let response = self.send(request, false).await?;
        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                GatewayError::new(ErrorKind::Decode, format!("Invalid completion body: {e}"))
            } else {
                transport_error(e)
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(ChatCompletion {
            content,
            total_tokens: parsed.usage.and_then(|u| u.total_tokens),
        })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, GatewayError> {
        let response = self.send(request, true).await?;
        let mut body = response.bytes_stream();
        let mut decoder = StreamDecoder::new();
        let mut full = String::new();

        'read: while let Some(chunk) = body.next().await {
            let bytes = chunk.map_err(transport_error)?;
            for item in decoder.push(&bytes)? {
                match item {
                    StreamItem::Token(token) => {
                        on_token(&token);
                        full.push_str(&token);
                    }
                    StreamItem::Done => break 'read,
                }
            }
        }
        if let Some(StreamItem::Token(token)) = decoder.finish()? {
            on_token(&token);
            full.push_str(&token);
        }

        Ok(full)
    }
}

fn classify_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        429 => ErrorKind::RateLimited,
        401 | 403 => ErrorKind::Auth,
        code @ 500..=599 => ErrorKind::Server(code),
        code => ErrorKind::InvalidRequest(code),
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if let Some(status) = err.status() {
        classify_status(status)
    } else if err.is_builder() {
        ErrorKind::Config
    } else {
        ErrorKind::Network
    };
    GatewayError::new(kind, format!("Groq request failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorKind::RateLimited
        );
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), ErrorKind::Auth);
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            ErrorKind::Server(502)
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            ErrorKind::InvalidRequest(400)
        );
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = GroqGateway::new(GroqConfig::new("  ")).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let mut config = GroqConfig::new("gsk_test");
        config.base_url = "http://localhost:8080/v1/".to_string();
        let gateway = GroqGateway::new(config).unwrap();
        assert_eq!(gateway.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    /// Serves one canned HTTP response on a local port and returns its base URL.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let mut seen = Vec::new();
            // Read headers and the JSON body before answering
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                seen.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&seen);
                if n == 0 || (text.contains("\r\n\r\n") && text.trim_end().ends_with('}')) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn test_stream_delivers_each_fragment() {
        let base_url = serve_once(concat!(
            "HTTP/1.1 200 OK\r\n",
            "content-type: text/event-stream\r\n",
            "connection: close\r\n\r\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"const \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"App\"}}]}\n\n",
            "data: [DONE]\n\n",
        ))
        .await;
        let mut config = GroqConfig::new("gsk_test");
        config.base_url = base_url;
        let gateway = GroqGateway::new(config).unwrap();

        let request = crate::models::ModelConfig::default()
            .request(vec![ChatMessage::user("hi")]);
        let mut fragments = Vec::new();
        let content = gateway
            .stream(&request, &mut |token: &str| fragments.push(token.to_string()))
            .await
            .unwrap();

        assert_eq!(fragments, vec!["const ", "App"]);
        assert_eq!(content, "const App");
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let mut config = GroqConfig::new("gsk_test");
        // Port 9 (discard) is closed on test machines
        config.base_url = "http://127.0.0.1:9/v1".to_string();
        config.request_timeout = Duration::from_secs(5);
        let gateway = GroqGateway::new(config).unwrap();

        let request = crate::models::ModelConfig::default()
            .request(vec![ChatMessage::user("hi")]);
        let err = gateway.complete(&request).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Network | ErrorKind::Timeout));
    }
}
