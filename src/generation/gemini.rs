//! Gemini `generateContent` image client.
//!
//! Features:
//! - One POST per attempt to `{api_base}/models/{model}:generateContent`.
//! - Retry on timeouts, connect errors, HTTP 429/500/503, and `INTERNAL`
//!   error bodies, with exponential backoff.
//! - Per-request read timeout.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::response::{extract_image, internal_error_message};
use super::{GenerationError, ImageGenerator};
use crate::config::GenerationConfig;

const STYLE_INSTRUCTION: &str = "Redraw this golf hole as a clean top-down course diagram. \
Use a dark, high-contrast, minimalist style: deep charcoal background, flat fairway and \
green shapes, crisp white outlines for tee boxes, bunkers, water hazards and the pin. \
Keep the routing, shapes and proportions of the original hole. No text, labels, \
people, shadows or perspective.";

const MAX_ERROR_BODY_CHARS: usize = 512;

// ---------------------------------------------------------------------------
// Request types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
    response_modalities: [&'static str; 2],
}

/// Instruction text, with a consistency hint when a seed is given.
pub fn build_prompt(seed: Option<i64>) -> String {
    match seed {
        Some(seed) => format!(
            "{STYLE_INSTRUCTION} Style seed {seed}: render this hole exactly like every other \
             hole drawn with seed {seed} so the whole course looks consistent."
        ),
        None => STYLE_INSTRUCTION.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect::<String>() + "…"
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Gemini image generation client.
///
/// # Examples
///
/// ```no_run
/// use fairway::config::GenerationConfig;
/// use fairway::generation::GeminiClient;
///
/// let client = GeminiClient::from_config(&GenerationConfig::default()).unwrap();
/// ```
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
    params: GenerationConfig,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// The API key is resolved from the config or the environment; a missing
    /// key only surfaces when `stylize` is called.
    pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for generation API")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            model: config.model.trim().to_string(),
            api_key: config.resolved_api_key(),
            params: config.clone(),
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        })
    }

    fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_request(&self, input: &[u8], mime_type: &str, seed: Option<i64>) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: build_prompt(seed),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(input),
                        },
                    },
                ],
            }],
            generation_config: GenerationParams {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_output_tokens,
                top_p: self.params.top_p,
                top_k: self.params.top_k,
                response_modalities: ["TEXT", "IMAGE"],
            },
        }
    }

    /// Send one request and return the parsed body of a successful response.
    async fn send_once(
        &self,
        request: &GenerateRequest,
        api_key: &str,
    ) -> Result<Value, GenerationError> {
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if let Some(message) = body.as_ref().and_then(internal_error_message) {
            return Err(GenerationError::Internal(message));
        }

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: truncate(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        body.ok_or_else(|| {
            GenerationError::InvalidResponse(format!(
                "body is not JSON: {}",
                truncate(&text, MAX_ERROR_BODY_CHARS)
            ))
        })
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn stylize(
        &self,
        input: &[u8],
        mime_type: &str,
        seed: Option<i64>,
    ) -> Result<Option<Vec<u8>>, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;
        let request = self.build_request(input, mime_type, seed);

        let mut attempt = 1u32;
        let mut delay = self.initial_backoff;
        loop {
            debug!(attempt, model = %self.model, "Sending stylization request");
            match self.send_once(&request, api_key).await {
                Ok(body) => {
                    let image = extract_image(&body)?;
                    info!(
                        attempt,
                        bytes = image.as_ref().map_or(0, Vec::len),
                        "Stylization request completed"
                    );
                    return Ok(image);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        wait_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient generation failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
