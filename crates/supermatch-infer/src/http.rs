//! OpenAI-compatible embeddings client.
//!
//! `POST {api_url}/embeddings { input, model } -> { data: [ { embedding } ] }`.
//! Works against LM Studio, OpenAI and anything else speaking that shape.

use async_trait::async_trait;
use ndarray::Array1;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedder::{truncate_chars, EmbeddingProvider};
use supermatch_core::config::MAX_EMBED_INPUT_CHARS;
use supermatch_core::{EmbeddingSettings, Error, Result};

/// Async embeddings client for a single model with a fixed dimension.
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        if settings.model.trim().is_empty() {
            return Err(Error::Config("missing embedding model name".into()));
        }
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        let endpoint = format!("{}/embeddings", settings.api_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            dimension: settings.dimension,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Pull the first vector out of a response body and check its length.
    fn parse_response(&self, body: &str) -> Result<Array1<f32>> {
        let parsed: EmbeddingResponse = serde_json::from_str(body)
            .map_err(|e| Error::Embedding(format!("malformed embedding response: {}", e)))?;
        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("embedding response had no data".into()))?;
        if first.embedding.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: first.embedding.len(),
            });
        }
        Ok(Array1::from_vec(first.embedding))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Array1<f32>> {
        let input = truncate_chars(text, MAX_EMBED_INPUT_CHARS);
        let request = EmbeddingRequest {
            input,
            model: &self.model,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!("Requesting embedding ({} chars) from {}", input.chars().count(), self.endpoint);
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Embedding(format!("failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(Error::Embedding(format!("API error {}: {}", status, body)));
        }

        self.parse_response(&body)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn settings(api_url: String, dimension: usize) -> EmbeddingSettings {
        EmbeddingSettings {
            api_url,
            dimension,
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}/v1", addr), handle)
    }

    #[test]
    fn test_parse_response_checks_dimension() {
        let provider = HttpEmbeddingProvider::new(&settings("http://localhost:1".into(), 3)).unwrap();
        let ok = provider
            .parse_response(r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#)
            .unwrap();
        assert_eq!(ok.len(), 3);

        let err = provider
            .parse_response(r#"{"data":[{"embedding":[0.1,0.2]}]}"#)
            .unwrap_err();
        assert!(err.is_fatal());

        let err = provider.parse_response(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_posts_input_and_model() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"data":[{"embedding":[1.0,0.0,0.5]}]}"#.to_string(),
        )
        .await;
        let provider = HttpEmbeddingProvider::new(&settings(url, 3)).unwrap();

        let vector = provider.embed("graph neural networks").await.unwrap();
        assert_eq!(vector.to_vec(), vec![1.0, 0.0, 0.5]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/embeddings"));
        assert!(request.contains("\"input\":\"graph neural networks\""));
        assert!(request.contains(supermatch_core::config::DEFAULT_EMBEDDING_MODEL));
    }

    #[tokio::test]
    async fn test_embed_truncates_long_input() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"data":[{"embedding":[1.0]}]}"#.to_string(),
        )
        .await;
        let provider = HttpEmbeddingProvider::new(&settings(url, 1)).unwrap();

        let long = "a".repeat(MAX_EMBED_INPUT_CHARS + 500);
        provider.embed(&long).await.unwrap();

        let request = server.await.unwrap();
        let expected = format!("\"input\":\"{}\"", "a".repeat(MAX_EMBED_INPUT_CHARS));
        assert!(request.contains(&expected));
        assert!(!request.contains(&"a".repeat(MAX_EMBED_INPUT_CHARS + 1)));
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_failure() {
        let (url, _server) = serve_once(
            "HTTP/1.1 503 Service Unavailable",
            r#"{"error":"model not loaded"}"#.to_string(),
        )
        .await;
        let provider = HttpEmbeddingProvider::new(&settings(url, 3)).unwrap();

        let err = provider.embed("anything").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upstream_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider =
            HttpEmbeddingProvider::new(&settings(format!("http://{}/v1", addr), 3)).unwrap();
        let err = provider.embed("anything").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }
}
