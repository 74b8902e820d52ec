//! OCR engine seam: turn an encoded page into plain text.
//!
//! The engine is dependency-injected behind [`OcrEngine`] so the extractor's
//! orchestration can be tested with a scripted fake, and so deployments can
//! swap recognition backends without touching dispatch or progress logic.
//!
//! Engines report progress as raw fractions in `[0, 1]` through the supplied
//! sink; scaling to UI percentages is the extractor's job, not the engine's.
//! A sink is a plain closure rather than the full observer so engines stay
//! ignorant of stages and page arithmetic.

use crate::config::OcrConfig;
use crate::error::ExtractError;
use crate::pipeline::encode::EncodedPage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Receives engine-internal progress fractions in `[0, 1]`.
pub type FractionSink<'a> = &'a (dyn Fn(f32) + Send + Sync);

/// Converts one encoded page image into plain text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise text on `page` using the fixed recognition `language`.
    ///
    /// Implementations push coarse progress fractions into `progress` during
    /// the recognising phase; the stream is advisory and may be sparse.
    async fn recognize(
        &self,
        page: &EncodedPage,
        language: &str,
        progress: FractionSink<'_>,
    ) -> Result<String, ExtractError>;
}

const OCR_INSTRUCTION: &str = "\
Read every piece of visible text in this document image, top to bottom, \
left to right. Output plain text only: no commentary, no markdown fences, \
no description of the image. If no text is legible, output nothing.";

/// Production engine: posts the page to a local vision-model endpoint
/// (Ollama-style generate API) and returns the transcription.
pub struct HttpOcrEngine {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    images: Vec<&'a str>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpOcrEngine {
    pub fn new(config: &OcrConfig) -> Result<Self, crate::error::IntakeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                crate::error::IntakeError::InvalidConfig(format!("OCR HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    async fn recognize(
        &self,
        page: &EncodedPage,
        language: &str,
        progress: FractionSink<'_>,
    ) -> Result<String, ExtractError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: format!("{OCR_INSTRUCTION}\nRecognition language: {language}."),
            images: vec![&page.data],
            stream: false,
        };

        // The HTTP engine only has coarse-grained signal: request dispatched,
        // response received. Finer fractions come from engines that stream.
        progress(0.05);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("OCR endpoint unreachable: {e}");
                ExtractError::OcrFailed {
                    detail: format!("engine unreachable: {e}"),
                }
            })?;

        if !response.status().is_success() {
            return Err(ExtractError::OcrFailed {
                detail: format!("engine returned HTTP {}", response.status()),
            });
        }

        progress(0.9);

        let body: GenerateResponse = response.json().await.map_err(|e| ExtractError::OcrFailed {
            detail: format!("malformed engine response: {e}"),
        })?;

        let text = body.response.trim().to_string();
        debug!("engine returned {} bytes of text", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_construction_uses_config_endpoint() {
        let config = OcrConfig::default();
        let engine = HttpOcrEngine::new(&config).expect("default config builds");
        assert_eq!(engine.endpoint, config.endpoint);
        assert_eq!(engine.model, config.model);
    }

    #[test]
    fn request_serialises_with_image_payload() {
        let request = GenerateRequest {
            model: "llava",
            prompt: "read".into(),
            images: vec!["aGVsbG8="],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llava");
        assert_eq!(json["images"][0], "aGVsbG8=");
        assert_eq!(json["stream"], false);
    }
}
