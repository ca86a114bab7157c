use super::traits::PatientStore;
use crate::config::{redact_uri, MigrationConfig};
use crate::error::{MigrationError, Result};
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, InsertManyOptions};
use mongodb::{Client, Collection, IndexModel};
use std::time::Duration;
use tracing::{debug, info};

/// Patient collection backed by a MongoDB deployment
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connects and pings the server, so an unreachable endpoint fails here
    /// rather than at the first write.
    pub async fn connect(config: &MigrationConfig) -> Result<Self> {
        info!("🔌 Connecting to MongoDB at {}", redact_uri(&config.connection_uri));

        let mut options = ClientOptions::parse(&config.connection_uri)
            .await
            .map_err(connection_error)?;
        options.app_name = Some(config.app_name.clone());
        options.server_selection_timeout = Some(Duration::from_secs(config.server_selection_timeout_secs));

        let client = Client::with_options(options).map_err(connection_error)?;
        let database = client.database(&config.database_name);
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(connection_error)?;

        info!(
            "✅ Connected to {}.{}",
            config.database_name, config.collection_name
        );
        Ok(Self {
            collection: database.collection(&config.collection_name),
            client,
        })
    }

    /// Releases the client's connection pool.
    pub async fn close(self) {
        self.client.shutdown().await;
        debug!("MongoDB client shut down");
    }
}

fn connection_error(e: MongoError) -> MigrationError {
    MigrationError::Connection { message: e.to_string() }
}

/// Server selection and network failures mean the target went away; anything
/// else means the server refused the operation.
fn operation_error(e: MongoError) -> MigrationError {
    match *e.kind {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::Authentication { .. } => connection_error(e),
        _ => MigrationError::Write { message: e.to_string() },
    }
}

#[async_trait]
impl PatientStore for MongoStore {
    async fn clear(&self) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! {}, None)
            .await
            .map_err(operation_error)?;
        Ok(result.deleted_count)
    }

    async fn insert_all(&self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let options = InsertManyOptions::builder().ordered(true).build();
        let result = self
            .collection
            .insert_many(documents, options)
            .await
            .map_err(operation_error)?;
        Ok(result.inserted_ids.len())
    }

    async fn create_indexes(&self, fields: &[String]) -> Result<Vec<String>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let models = fields.iter().map(|field| {
            let mut keys = Document::new();
            keys.insert(field.clone(), 1);
            IndexModel::builder().keys(keys).build()
        });
        let result = self
            .collection
            .create_indexes(models, None)
            .await
            .map_err(operation_error)?;
        Ok(result.index_names)
    }

    async fn count(&self) -> Result<u64> {
        self.collection
            .count_documents(doc! {}, None)
            .await
            .map_err(operation_error)
    }

    async fn sample(&self) -> Result<Option<Document>> {
        self.collection
            .find_one(doc! {}, None)
            .await
            .map_err(operation_error)
    }

    async fn index_names(&self) -> Result<Vec<String>> {
        self.collection
            .list_index_names()
            .await
            .map_err(operation_error)
    }
}
