use crate::error::Result;
use async_trait::async_trait;
use mongodb::bson::Document;

/// Destination collection for migrated patient documents
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Deletes every document; returns how many were removed.
    async fn clear(&self) -> Result<u64>;

    /// Writes all documents in one bulk operation; returns how many were inserted.
    /// Either the whole batch is accepted or the call fails.
    async fn insert_all(&self, documents: Vec<Document>) -> Result<usize>;

    /// Creates one ascending single-field index per field; returns the index names.
    async fn create_indexes(&self, fields: &[String]) -> Result<Vec<String>>;

    async fn count(&self) -> Result<u64>;

    /// Any one document of the collection.
    async fn sample(&self) -> Result<Option<Document>>;

    /// Names of every index on the collection.
    async fn index_names(&self) -> Result<Vec<String>>;
}

/// Index name MongoDB derives for an ascending single-field index.
pub fn ascending_index_name(field: &str) -> String {
    format!("{field}_1")
}
