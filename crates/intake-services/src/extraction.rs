//! Structured field extraction keyed by document type.

use async_trait::async_trait;
use intake_core::{AppError, DocumentFields, DocumentType, StructuredRecord};
use serde_json::{json, Value};

use crate::llm::{external, InputContent, JsonSchemaFormat, ResponsesClient};

const SERVICE: &str = "structured extraction";

#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Extract the record for `document_type`. `Garbage` yields an empty record
    /// without contacting the backend.
    async fn extract(
        &self,
        document_url: &str,
        is_image: bool,
        document_type: DocumentType,
    ) -> Result<StructuredRecord, AppError>;
}

/// Output contract for a document type, `None` when the type carries no fields.
fn schema_for(document_type: DocumentType) -> Option<JsonSchemaFormat> {
    let name = match document_type {
        DocumentType::UniversalCorrectionDocument => "universal_correction_document",
        DocumentType::Invoice => "invoice",
        DocumentType::GoodsShipmentNote => "goods_shipment_note",
        DocumentType::Garbage => return None,
    };
    Some(JsonSchemaFormat::strict(
        name,
        json!({
            "type": "object",
            "properties": {
                "number": {"type": "integer", "description": "Document number"},
                "date": {"type": "string", "description": "Document date"},
                "organization": {"type": "string", "description": "Counterparty organization"},
                "amount": {"type": "integer", "description": "Total amount"},
            },
            "required": ["number", "date", "organization", "amount"],
            "additionalProperties": false,
        }),
    ))
}

fn prompt_for(document_type: DocumentType) -> String {
    format!(
        "You are a chief accountant. The attached document is a {}. \
Extract its number, date, counterparty organization and total amount.",
        document_type
    )
}

fn parse_record(document_type: DocumentType, output: Value) -> Result<StructuredRecord, AppError> {
    let fields: DocumentFields =
        serde_json::from_value(output).map_err(|e| AppError::ExternalService {
            service: SERVICE,
            message: format!("response does not match the {} schema: {}", document_type, e),
        })?;
    Ok(StructuredRecord::from_fields(document_type, fields))
}

pub struct LlmExtractor {
    client: ResponsesClient,
}

impl LlmExtractor {
    pub fn new(client: ResponsesClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StructuredExtractor for LlmExtractor {
    #[tracing::instrument(skip(self), fields(model = %self.client.model(), document_type = %document_type))]
    async fn extract(
        &self,
        document_url: &str,
        is_image: bool,
        document_type: DocumentType,
    ) -> Result<StructuredRecord, AppError> {
        let Some(format) = schema_for(document_type) else {
            return Ok(StructuredRecord::Garbage);
        };

        let output = self
            .client
            .structured(
                &prompt_for(document_type),
                InputContent::document(document_url, is_image),
                format,
            )
            .await
            .map_err(|e| external(SERVICE, e))?;

        parse_record(document_type, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_has_no_schema() {
        assert!(schema_for(DocumentType::Garbage).is_none());
        for t in DocumentType::ALL.into_iter().filter(DocumentType::has_fields) {
            let format = schema_for(t).unwrap();
            assert!(format.strict);
            assert_eq!(
                format.schema["required"],
                json!(["number", "date", "organization", "amount"])
            );
        }
    }

    #[test]
    fn record_tagged_with_requested_type() {
        let output = json!({
            "number": 17,
            "date": "12.02.2024",
            "organization": "Vector LLC",
            "amount": 99000
        });
        let record = parse_record(DocumentType::GoodsShipmentNote, output).unwrap();
        assert_eq!(record.document_type(), DocumentType::GoodsShipmentNote);
        assert_eq!(record.fields().unwrap().number, 17);
    }

    #[test]
    fn malformed_fields_are_service_errors() {
        let err = parse_record(DocumentType::Invoice, json!({"number": "seventeen"})).unwrap_err();
        assert!(matches!(err, AppError::ExternalService { .. }));
    }
}
