//! HTTP client for a remote text-embedding endpoint.
//!
//! The endpoint receives `{"text": "..."}` and answers
//! `{"embedding": [f32, ...]}` in the image embedding space. Vectors are
//! checked against the configured dimension and L2-normalised before use.

use std::time::Duration;

use clipseek_fusion::encoder::l2_normalize;
use clipseek_fusion::{FusionError, TextEncoder};
use serde::{Deserialize, Serialize};

use crate::config::EncoderConfig;
use crate::error::{Result, ServiceError};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// [`TextEncoder`] backed by a remote embedding service.
#[derive(Debug, Clone)]
pub struct HttpTextEncoder {
    client: reqwest::Client,
    endpoint: String,
    dimension: usize,
}

impl HttpTextEncoder {
    /// Build an encoder for `config.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Encoder`] if the HTTP client cannot be built.
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Encoder(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, &config.endpoint, config.dimension))
    }

    /// Build an encoder around an existing client.
    pub fn with_client(client: reqwest::Client, endpoint: &str, dimension: usize) -> Self {
        Self {
            client,
            endpoint: endpoint.to_owned(),
            dimension,
        }
    }

    /// The embedding endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TextEncoder for HttpTextEncoder {
    async fn encode(&self, text: &str) -> std::result::Result<Vec<f32>, FusionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| FusionError::Encoder(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FusionError::Encoder(format!(
                "embedding endpoint returned {status}"
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| FusionError::Encoder(format!("malformed embedding response: {e}")))?;

        let mut embedding = body.embedding;
        if embedding.len() != self.dimension {
            return Err(FusionError::Encoder(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(FusionError::Encoder("embedding contains non-finite values".into()));
        }
        l2_normalize(&mut embedding);
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
