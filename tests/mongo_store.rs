//! MongoDB store checks. The live ones are ignored by default; run them with
//! `MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`.

use anyhow::Result;
use mongodb::bson::doc;
use patient_migrator::config::MigrationConfig;
use patient_migrator::pipeline::storage::{MongoStore, PatientStore};
use patient_migrator::MigrationError;

fn live_config(collection: &str) -> MigrationConfig {
    MigrationConfig {
        connection_uri: std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017/".to_string()),
        database_name: "healthcare_db_test".to_string(),
        collection_name: collection.to_string(),
        ..MigrationConfig::default()
    }
}

#[tokio::test]
#[ignore]
async fn bulk_insert_and_index_round_trip() -> Result<()> {
    let store = MongoStore::connect(&live_config("patients_store_test")).await?;
    store.clear().await?;

    let inserted = store
        .insert_all(vec![
            doc! { "Name": "Bobby Jackson", "Hospital": "Sons and Miller" },
            doc! { "Name": "Bobby Jackson", "Hospital": "Sons and Miller" },
        ])
        .await?;
    assert_eq!(inserted, 2);

    let names = store.create_indexes(&["Hospital".to_string()]).await?;
    assert_eq!(names, vec!["Hospital_1"]);
    assert!(store.index_names().await?.contains(&"Hospital_1".to_string()));
    assert_eq!(store.count().await?, 2);

    store.clear().await?;
    store.close().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let mut config = live_config("patients");
    config.connection_uri = "mongodb://127.0.0.1:1/".to_string();
    config.server_selection_timeout_secs = 1;

    let err = MongoStore::connect(&config).await.err().unwrap();
    assert!(matches!(err, MigrationError::Connection { .. }));
}
