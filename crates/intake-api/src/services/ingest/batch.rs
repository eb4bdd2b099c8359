use intake_core::{
    AppError, BatchResult, ErrorMetadata, IngestFailure, IngestItem, IngestResult, PackageRef,
};
use intake_processing::content_type::{has_allowed_extension, resolve_content_type};
use intake_processing::{ArchiveFormat, ArchiveReader};
use std::sync::Arc;

use super::pipeline::IngestPipeline;
use crate::session::SessionContext;
use crate::utils::upload::UploadedFile;

/// Turns the uploads of one request into one result entry per derived item.
///
/// Items run strictly one after another so only one member's bytes are held
/// at a time. Nothing in here returns an error: archive-level and item-level
/// failures both become error entries.
#[derive(Clone)]
pub struct BatchCoordinator {
    pipeline: Arc<IngestPipeline>,
    archives: ArchiveReader,
    /// Extensions archive members must carry to be ingested
    allowed_extensions: Vec<String>,
}

impl BatchCoordinator {
    pub fn new(
        pipeline: Arc<IngestPipeline>,
        archives: ArchiveReader,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            pipeline,
            archives,
            allowed_extensions,
        }
    }

    /// Container format of a top-level upload, if it is an archive.
    pub fn archive_format(&self, upload: &UploadedFile) -> Option<ArchiveFormat> {
        self.archives
            .detect(&upload.name, upload.content_type.as_deref())
    }

    pub async fn process(&self, uploads: Vec<UploadedFile>, session: &SessionContext) -> BatchResult {
        let mut batch = BatchResult::default();
        for upload in uploads {
            if self.archive_format(&upload).is_some() {
                self.expand_archive(upload, session, &mut batch).await;
            } else {
                let content_type = resolve_content_type(&upload.name, upload.content_type.as_deref());
                let item = IngestItem {
                    name: upload.name,
                    data: upload.data,
                    content_type,
                    package: None,
                    session_id: session.session_id.clone(),
                    user_id: session.user_id.clone(),
                };
                batch.push(self.run_item(item).await);
            }
        }
        batch
    }

    async fn expand_archive(
        &self,
        upload: UploadedFile,
        session: &SessionContext,
        batch: &mut BatchResult,
    ) {
        let package = PackageRef::new(upload.name.clone());

        let mut members = match self
            .archives
            .open(&upload.name, upload.content_type.as_deref(), upload.data)
            .await
        {
            Ok(members) => members,
            Err(e) => {
                let err = AppError::from(e);
                tracing::warn!(archive = %upload.name, error = %err, "Archive rejected");
                batch.push(failure(&upload.name, None, &err));
                return;
            }
        };

        tracing::info!(
            archive = %upload.name,
            package_id = %package.id,
            format = %members.format(),
            entries = members.entry_count(),
            "Expanding archive"
        );

        let mut ingested = 0usize;
        while let Some(next) = members.next().await {
            let member = match next {
                Ok(member) => member,
                Err(e) => {
                    let err = AppError::from(e);
                    tracing::warn!(
                        archive = %upload.name,
                        package_id = %package.id,
                        error = %err,
                        "Archive enumeration aborted"
                    );
                    batch.push(failure(&upload.name, Some(&package), &err));
                    break;
                }
            };

            if !has_allowed_extension(&member.name, &self.allowed_extensions) {
                tracing::info!(
                    archive = %upload.name,
                    member = %member.name,
                    "Skipping archive member outside the document allow-list"
                );
                continue;
            }

            let item = IngestItem {
                name: member.name,
                data: member.data,
                content_type: member.content_type,
                package: Some(package.clone()),
                session_id: session.session_id.clone(),
                user_id: session.user_id.clone(),
            };
            batch.push(self.run_item(item).await);
            ingested += 1;
        }

        tracing::info!(
            archive = %upload.name,
            package_id = %package.id,
            members = ingested,
            "Archive processed"
        );
    }

    async fn run_item(&self, item: IngestItem) -> IngestResult {
        match self.pipeline.ingest(&item).await {
            Ok(document) => document.into(),
            Err(err) => {
                tracing::warn!(
                    filename = %item.name,
                    error = %err,
                    error_code = err.error_code(),
                    "Item ingestion failed"
                );
                failure(&item.name, item.package.as_ref(), &err).into()
            }
        }
    }
}

fn failure(name: &str, package: Option<&PackageRef>, err: &AppError) -> IngestFailure {
    IngestFailure {
        name: name.to_string(),
        error: err.client_message(),
        code: err.error_code().to_string(),
        package_id: package.map(|p| p.id),
        package_name: package.map(|p| p.name.clone()),
    }
}
