//! Training-document client.
//!
//! Every persona reads from one provider-hosted vector store. Uploading a
//! document means two provider calls: store the file, then attach it to that
//! vector store. There is no rollback if the second call fails.

use tracing::{info, warn};

use crate::error::RelayError;
use crate::provider::{AssistantsProvider, FileDescriptor, IndexInfo};

#[derive(Debug, Clone)]
pub struct DocumentClient {
    provider: AssistantsProvider,
    vector_store_id: String,
}

impl DocumentClient {
    pub fn new(provider: AssistantsProvider, vector_store_id: impl Into<String>) -> Self {
        Self { provider, vector_store_id: vector_store_id.into() }
    }

    pub fn vector_store_id(&self) -> &str {
        &self.vector_store_id
    }

    /// Upload `bytes` as `filename` and attach it to the shared store.
    /// Returns the provider file id.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, RelayError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(RelayError::Validation("filename must not be empty".into()));
        }
        if bytes.is_empty() {
            return Err(RelayError::Validation(format!("file '{filename}' is empty")));
        }

        let size = bytes.len();
        let file = self.provider.upload_file(bytes, filename).await?;

        if let Err(e) = self.provider.attach_file(&self.vector_store_id, &file.file_id).await {
            warn!(
                file_id = %file.file_id,
                vector_store_id = %self.vector_store_id,
                error = %e,
                "file uploaded but not attached; it is orphaned on the provider"
            );
            return Err(e.into());
        }

        info!(file_id = %file.file_id, %filename, size, vector_store_id = %self.vector_store_id, "document added to knowledge base");
        Ok(file.file_id)
    }

    /// Files attached to the shared store, in provider order.
    pub async fn list_for_index(&self) -> Result<Vec<FileDescriptor>, RelayError> {
        Ok(self.provider.list_index_files(&self.vector_store_id).await?)
    }

    pub async fn index_info(&self) -> Result<IndexInfo, RelayError> {
        Ok(self.provider.retrieve_index(&self.vector_store_id).await?)
    }
}
