use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::AppError;

/// Closed set of document-type labels the classifier may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum DocumentType {
    #[serde(rename = "Universal Correction Document")]
    UniversalCorrectionDocument,
    #[serde(rename = "Invoice")]
    Invoice,
    #[serde(rename = "Goods Shipment Note")]
    GoodsShipmentNote,
    #[serde(rename = "Garbage")]
    Garbage,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::UniversalCorrectionDocument,
        DocumentType::Invoice,
        DocumentType::GoodsShipmentNote,
        DocumentType::Garbage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::UniversalCorrectionDocument => "Universal Correction Document",
            DocumentType::Invoice => "Invoice",
            DocumentType::GoodsShipmentNote => "Goods Shipment Note",
            DocumentType::Garbage => "Garbage",
        }
    }

    /// Whether structured fields exist for this type.
    pub fn has_fields(&self) -> bool {
        !matches!(self, DocumentType::Garbage)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| AppError::UnknownDocumentType(label.to_string()))
    }
}

/// Output of the classification step (`metadata1` in upload responses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Classification {
    pub document_type: DocumentType,
}

/// Fields extracted from accounting documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DocumentFields {
    /// Document number
    pub number: i64,
    /// Document date as printed on the document
    pub date: String,
    /// Counterparty organization
    pub organization: String,
    /// Total amount
    pub amount: i64,
}

/// Structured record keyed by document type (`metadata2` in upload responses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "document_type")]
pub enum StructuredRecord {
    #[serde(rename = "Universal Correction Document")]
    UniversalCorrectionDocument(DocumentFields),
    #[serde(rename = "Invoice")]
    Invoice(DocumentFields),
    #[serde(rename = "Goods Shipment Note")]
    GoodsShipmentNote(DocumentFields),
    #[serde(rename = "Garbage")]
    Garbage,
}

impl StructuredRecord {
    /// Wrap extracted fields in the variant matching `document_type`.
    pub fn from_fields(document_type: DocumentType, fields: DocumentFields) -> Self {
        match document_type {
            DocumentType::UniversalCorrectionDocument => {
                StructuredRecord::UniversalCorrectionDocument(fields)
            }
            DocumentType::Invoice => StructuredRecord::Invoice(fields),
            DocumentType::GoodsShipmentNote => StructuredRecord::GoodsShipmentNote(fields),
            DocumentType::Garbage => StructuredRecord::Garbage,
        }
    }

    pub fn document_type(&self) -> DocumentType {
        match self {
            StructuredRecord::UniversalCorrectionDocument(_) => {
                DocumentType::UniversalCorrectionDocument
            }
            StructuredRecord::Invoice(_) => DocumentType::Invoice,
            StructuredRecord::GoodsShipmentNote(_) => DocumentType::GoodsShipmentNote,
            StructuredRecord::Garbage => DocumentType::Garbage,
        }
    }

    pub fn fields(&self) -> Option<&DocumentFields> {
        match self {
            StructuredRecord::UniversalCorrectionDocument(f)
            | StructuredRecord::Invoice(f)
            | StructuredRecord::GoodsShipmentNote(f) => Some(f),
            StructuredRecord::Garbage => None,
        }
    }
}
