//! Document operations

use super::GatewayClient;
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};
use crate::types::document::{Document, UploadFile};
use crate::types::identifiers::{DocumentId, UserId};
use crate::types::options::PollOptions;
use crate::upload::{UploadPollSession, document_path};

impl<T: Transport + 'static> GatewayClient<T> {
    /// Fetch a document with its chunks
    ///
    /// # Errors
    /// Returns the request error (`Http { status: 404 }` for an unknown id)
    pub async fn fetch_document(&self, id: DocumentId) -> Result<Document> {
        self.coordinator
            .execute_json(ApiRequest::get(document_path(id)))
            .await
    }

    /// Upload `file` for `user_id` and poll with the client's default settings
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configured poll settings are unusable
    pub fn upload(&self, file: UploadFile, user_id: UserId) -> Result<UploadPollSession> {
        self.upload_with(file, user_id, self.options.poll_options())
    }

    /// Upload `file` for `user_id` with explicit poll settings
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `options` cannot make progress
    pub fn upload_with(
        &self,
        file: UploadFile,
        user_id: UserId,
        options: PollOptions,
    ) -> Result<UploadPollSession> {
        log::info!(
            "Starting upload of {} ({} bytes, poll every {:?}, give up after {:?})",
            file.file_name,
            file.len(),
            options.interval,
            options.timeout
        );
        UploadPollSession::start(std::sync::Arc::clone(&self.coordinator), file, user_id, options)
    }
}
