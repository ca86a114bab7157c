use super::traits::{ascending_index_name, PatientStore};
use crate::error::{MigrationError, Result};
use async_trait::async_trait;
use mongodb::bson::Document;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection for development/testing
#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<Vec<Document>>,
    indexes: Mutex<Vec<String>>,
    reject_inserts: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose bulk inserts are always rejected.
    pub fn rejecting_inserts() -> Self {
        Self {
            reject_inserts: true,
            ..Self::default()
        }
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.documents.lock().await.clone()
    }
}

#[async_trait]
impl PatientStore for InMemoryStore {
    async fn clear(&self) -> Result<u64> {
        let mut documents = self.documents.lock().await;
        let removed = documents.len() as u64;
        documents.clear();
        Ok(removed)
    }

    async fn insert_all(&self, documents: Vec<Document>) -> Result<usize> {
        if self.reject_inserts {
            return Err(MigrationError::Write {
                message: "insert rejected by in-memory store".to_string(),
            });
        }
        let inserted = documents.len();
        self.documents.lock().await.extend(documents);
        debug!("Inserted {} documents in memory", inserted);
        Ok(inserted)
    }

    async fn create_indexes(&self, fields: &[String]) -> Result<Vec<String>> {
        let mut indexes = self.indexes.lock().await;
        let mut created = Vec::with_capacity(fields.len());
        for field in fields {
            let name = ascending_index_name(field);
            if !indexes.contains(&name) {
                indexes.push(name.clone());
            }
            created.push(name);
        }
        Ok(created)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.documents.lock().await.len() as u64)
    }

    async fn sample(&self) -> Result<Option<Document>> {
        Ok(self.documents.lock().await.first().cloned())
    }

    async fn index_names(&self) -> Result<Vec<String>> {
        let mut names = vec!["_id_".to_string()];
        names.extend(self.indexes.lock().await.iter().cloned());
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn insert_count_and_clear() {
        let store = InMemoryStore::new();
        let inserted = store
            .insert_all(vec![doc! { "Name": "A" }, doc! { "Name": "A" }])
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.sample().await.unwrap().unwrap().get_str("Name").unwrap(), "A");
        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn indexes_are_idempotent_and_named_like_mongodb() {
        let store = InMemoryStore::new();
        let fields = vec!["Hospital".to_string(), "Medical Condition".to_string()];
        store.create_indexes(&fields).await.unwrap();
        let names = store.create_indexes(&fields).await.unwrap();

        assert_eq!(names, vec!["Hospital_1", "Medical Condition_1"]);
        assert_eq!(store.index_names().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rejecting_store_fails_with_write_error() {
        let store = InMemoryStore::rejecting_inserts();
        let err = store.insert_all(vec![doc! { "Name": "A" }]).await.unwrap_err();
        assert!(matches!(err, MigrationError::Write { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
