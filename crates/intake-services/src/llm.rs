//! Minimal client for OpenAI-compatible Responses APIs with strict JSON-schema output.

use anyhow::{anyhow, Context, Result};
use intake_core::{AppError, Config};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Endpoint, credentials and model for one OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.llm_base_url().to_string(),
            api_key: config.llm_api_key().map(str::to_string),
            model: config.llm_model().to_string(),
            timeout: Duration::from_secs(config.http_client_timeout_secs()),
        }
    }

    /// Build the shared HTTP client for this backend.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to create HTTP client")
    }
}

/// `text.format` of a Responses request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    #[serde(rename = "type")]
    pub format_type: &'static str,
    pub name: String,
    pub strict: bool,
    pub schema: Value,
}

impl JsonSchemaFormat {
    pub fn strict(name: impl Into<String>, schema: Value) -> Self {
        Self {
            format_type: "json_schema",
            name: name.into(),
            strict: true,
            schema,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
    InputFile { file_url: String },
}

impl InputContent {
    /// The document reference sent to the model: images by URL, everything else as a file.
    pub fn document(url: &str, is_image: bool) -> Self {
        if is_image {
            InputContent::InputImage {
                image_url: url.to_string(),
            }
        } else {
            InputContent::InputFile {
                file_url: url.to_string(),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: Vec<InputContent>,
}

#[derive(Debug, Serialize)]
struct TextOptions {
    format: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage>,
    text: TextOptions,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputContent {
    OutputText {
        text: String,
    },
    Refusal {
        refusal: String,
    },
    #[serde(other)]
    Other,
}

/// Pull the first text block out of a Responses payload.
pub(crate) fn first_output_text(body: &str) -> Result<String> {
    let parsed: ResponsesResponse =
        serde_json::from_str(body).context("Failed to parse Responses API payload")?;

    for item in parsed.output.into_iter().filter(|i| i.item_type == "message") {
        for content in item.content {
            match content {
                OutputContent::OutputText { text } => return Ok(text),
                OutputContent::Refusal { refusal } => {
                    return Err(anyhow!("Model refused the request: {}", refusal))
                }
                OutputContent::Other => {}
            }
        }
    }
    Err(anyhow!("No output text in Responses API payload"))
}

/// Posts Responses requests and decodes their JSON output.
#[derive(Clone)]
pub struct ResponsesClient {
    settings: LlmSettings,
    client: reqwest::Client,
}

impl ResponsesClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = settings.http_client()?;
        Ok(Self { settings, client })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn responses_url(&self) -> String {
        format!("{}/responses", self.settings.base_url.trim_end_matches('/'))
    }

    /// Send `system_prompt` plus one document reference and return the parsed JSON output.
    pub async fn structured(
        &self,
        system_prompt: &str,
        document: InputContent,
        format: JsonSchemaFormat,
    ) -> Result<Value> {
        let body = ResponsesRequest {
            model: &self.settings.model,
            input: vec![
                InputMessage {
                    role: "system",
                    content: vec![InputContent::InputText {
                        text: system_prompt.to_string(),
                    }],
                },
                InputMessage {
                    role: "user",
                    content: vec![document],
                },
            ],
            text: TextOptions { format },
        };

        let mut request = self.client.post(self.responses_url()).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to send Responses API request")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Responses API response")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Responses API failed with status {}: {}",
                status,
                api_error_message(&text)
            ));
        }

        let output = first_output_text(&text)?;
        serde_json::from_str(&output).context("Model output is not valid JSON")
    }
}

/// Prefer the `error.message` of an OpenAI error body over the raw text.
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Wrap a client failure as an item-level external service error.
pub(crate) fn external(service: &'static str, err: anyhow::Error) -> AppError {
    AppError::ExternalService {
        service,
        message: format!("{:#}", err),
    }
}
