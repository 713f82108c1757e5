//! Remote embedding client
//!
//! Speaks the `batchEmbedContents` wire shape: one POST per batch, a
//! task type on every request, vectors validated against the declared
//! dimension before anything leaves this module.

use std::time::Duration;

use async_trait::async_trait;
use repomind_config::EmbeddingConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::{EmbeddingProvider, EmbeddingTask};

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: Content,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Remote embedding provider over HTTP
pub struct RemoteEmbeddingClient {
    client: Client,
    api_base: String,
    api_key: String,
    model_id: String,
    dimension: usize,
}

impl RemoteEmbeddingClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error when no API key is configured or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| EmbeddingError::Other("EMBEDDING_API_KEY is not set".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key,
            model_id: config.model_id.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingClient {
    #[tracing::instrument(skip(self, texts), fields(batch = texts.len(), task = task.as_str()))]
    async fn embed_batch(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = BatchRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: format!("models/{}", self.model_id),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                    task_type: task.as_str(),
                })
                .collect(),
        };

        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.api_base, self.model_id, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }

        let parsed: BatchResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::Decode(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        let mut vectors = Vec::with_capacity(parsed.embeddings.len());
        for embedding in parsed.embeddings {
            if embedding.values.len() != self.dimension {
                // Fail the whole batch fast; a wrong-width vector must
                // never reach the store
                return Err(EmbeddingError::Dimension {
                    expected: self.dimension,
                    actual: embedding.values.len(),
                });
            }
            vectors.push(embedding.values);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

fn classify_status(status: StatusCode, detail: &str) -> EmbeddingError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            EmbeddingError::Unauthorized(detail.to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => EmbeddingError::RateLimited,
        s if s.is_server_error() => EmbeddingError::Upstream(format!("status {s}: {detail}")),
        s => EmbeddingError::Other(format!("status {s}: {detail}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, dimension: usize) -> RemoteEmbeddingClient {
        RemoteEmbeddingClient::new(&EmbeddingConfig {
            api_key: Some("test-key".to_string()),
            api_base: server.uri(),
            model_id: "text-embedding-004".to_string(),
            dimension,
            ..EmbeddingConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_task_type_and_returns_vectors_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:batchEmbedContents"))
            .and(body_partial_json(serde_json::json!({
                "requests": [
                    { "taskType": "RETRIEVAL_DOCUMENT" },
                    { "taskType": "RETRIEVAL_DOCUMENT" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [
                    { "values": [1.0, 0.0, 0.0] },
                    { "values": [0.0, 1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, 3);
        let vectors = client
            .embed_batch(
                &["first text".to_string(), "second text".to_string()],
                EmbeddingTask::RetrievalDocument,
            )
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn wrong_width_vector_fails_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [ { "values": [0.5, 0.5] } ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, 768);
        let err = client
            .embed_batch(&["text".to_string()], EmbeddingTask::RetrievalDocument)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::Dimension {
                expected: 768,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn throttling_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server, 3);
        let err = client
            .embed_batch(&["text".to_string()], EmbeddingTask::RetrievalQuery)
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::RateLimited));
    }
}
