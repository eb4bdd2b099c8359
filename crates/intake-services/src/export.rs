//! Optional sink that receives every structured record after persistence.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use intake_core::{AppError, StructuredRecord};
use std::time::Duration;

use crate::llm::external;

#[async_trait]
pub trait RecordExporter: Send + Sync {
    async fn export(&self, record: &StructuredRecord) -> Result<(), AppError>;
}

/// POSTs records as JSON to a fixed URL.
#[derive(Clone)]
pub struct HttpRecordExporter {
    url: String,
    client: reqwest::Client,
}

impl HttpRecordExporter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl RecordExporter for HttpRecordExporter {
    #[tracing::instrument(skip(self, record), fields(url = %self.url, document_type = %record.document_type()))]
    async fn export(&self, record: &StructuredRecord) -> Result<(), AppError> {
        let result: Result<()> = async {
            let response = self
                .client
                .post(&self.url)
                .json(record)
                .send()
                .await
                .context("Failed to send export request")?;
            if !response.status().is_success() {
                return Err(anyhow!("export sink returned status {}", response.status()));
            }
            Ok(())
        }
        .await;

        result.map_err(|e| external("export", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use intake_core::{DocumentFields, DocumentType};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn posts_record_as_json() {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = received.clone();
        let app = Router::new()
            .route(
                "/records",
                post(move |Json(body): Json<Value>| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().unwrap().push(body);
                        StatusCode::NO_CONTENT
                    }
                }),
            )
            .route("/broken", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let record = StructuredRecord::from_fields(
            DocumentType::Invoice,
            DocumentFields {
                number: 5,
                date: "2024-01-01".to_string(),
                organization: "Acme".to_string(),
                amount: 10,
            },
        );

        let exporter =
            HttpRecordExporter::new(format!("http://{}/records", addr), Duration::from_secs(5))
                .unwrap();
        exporter.export(&record).await.unwrap();
        let bodies = received.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["document_type"], "Invoice");
        assert_eq!(bodies[0]["number"], 5);

        let broken =
            HttpRecordExporter::new(format!("http://{}/broken", addr), Duration::from_secs(5))
                .unwrap();
        let err = broken.export(&record).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService { service: "export", .. }));
    }
}
