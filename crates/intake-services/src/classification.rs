//! Document-type classification.

use async_trait::async_trait;
use intake_core::{AppError, Classification, DocumentType};
use serde_json::{json, Value};

use crate::llm::{external, InputContent, JsonSchemaFormat, ResponsesClient};

const SERVICE: &str = "classification";

const SYSTEM_PROMPT: &str = "You are a chief accountant with many years of experience. \
Determine the type of the attached document. Answer with one of: \
Universal Correction Document, Invoice, Goods Shipment Note, Garbage. \
Use Garbage for anything that is not one of the accounting documents listed.";

/// Assigns one of the closed set of document-type labels to a stored document.
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    async fn classify(&self, document_url: &str, is_image: bool)
        -> Result<Classification, AppError>;
}

fn classification_schema() -> JsonSchemaFormat {
    let labels: Vec<&str> = DocumentType::ALL.iter().map(|t| t.as_str()).collect();
    JsonSchemaFormat::strict(
        "document_type",
        json!({
            "type": "object",
            "properties": {
                "document_type": {
                    "type": "string",
                    "description": "The type of the document.",
                    "enum": labels,
                }
            },
            "required": ["document_type"],
            "additionalProperties": false,
        }),
    )
}

/// Labels outside the known set are rejected rather than mapped to a default.
fn parse_classification(output: &Value) -> Result<Classification, AppError> {
    let label = output
        .get("document_type")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::ExternalService {
            service: SERVICE,
            message: "response has no document_type".to_string(),
        })?;
    Ok(Classification {
        document_type: label.parse()?,
    })
}

pub struct LlmClassifier {
    client: ResponsesClient,
}

impl LlmClassifier {
    pub fn new(client: ResponsesClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentClassifier for LlmClassifier {
    #[tracing::instrument(skip(self), fields(model = %self.client.model()))]
    async fn classify(
        &self,
        document_url: &str,
        is_image: bool,
    ) -> Result<Classification, AppError> {
        let output = self
            .client
            .structured(
                SYSTEM_PROMPT,
                InputContent::document(document_url, is_image),
                classification_schema(),
            )
            .await
            .map_err(|e| external(SERVICE, e))?;

        let classification = parse_classification(&output)?;
        tracing::debug!(
            document_type = %classification.document_type,
            "Document classified"
        );
        Ok(classification)
    }
}
