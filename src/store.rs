//! MongoDB collection wrapper for stored documents.
//!
//! The collection handle carries a majority write concern so every insert is
//! acknowledged by a majority of replica set members. Deduplication is
//! optimistic: inserts are attempted unconditionally and a duplicate-key
//! rejection from the server is classified as [`InsertOutcome::Duplicate`],
//! avoiding a read before every write.

use crate::config::MongoConfig;
use crate::error::{DbError, Result};
use crate::ingest::StoredDocument;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::{Acknowledgment, ClientOptions, CollectionOptions, IndexOptions, WriteConcern};
use mongodb::{Client, Collection, IndexModel};
use std::time::Duration;

/// Server-side duplicate key error code.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Classification of a single insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was durably appended to the collection.
    Inserted,
    /// The store already holds a document with this content hash. Expected
    /// and non-fatal; the existing record is left untouched.
    Duplicate,
}

/// The write surface the ingestion pipeline needs from a store. Implemented
/// by [`DocumentStore`] and by in-memory mocks in tests.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn insert(&self, document: &StoredDocument) -> Result<InsertOutcome>;
    async fn count(&self) -> Result<u64>;
}

/// Replica set state as reported by the server, for logging and validation.
#[derive(Debug, Clone)]
pub struct ReplicaSetSummary {
    pub set_name: String,
    pub members: Vec<ReplicaMember>,
}

#[derive(Debug, Clone)]
pub struct ReplicaMember {
    pub name: String,
    pub state: String,
}

impl ReplicaSetSummary {
    pub fn primary_count(&self) -> usize {
        self.members
            .iter()
            .filter(|member| member.state == "PRIMARY")
            .count()
    }
}

/// Typed handle on the speeches collection.
pub struct DocumentStore {
    client: Client,
    collection: Collection<StoredDocument>,
}

impl DocumentStore {
    /// Connect to the store, verify it answers a ping, and log what we
    /// connected to. Connection failure here is fatal for the run.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| DbError::Connect(e.to_string()))?;
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));
        options.app_name = Some("corpus-ingest".to_string());

        let client = Client::with_options(options).map_err(|e| DbError::Connect(e.to_string()))?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DbError::Connect(e.to_string()))?;

        let write_concern = WriteConcern::builder()
            .w(Acknowledgment::Majority)
            .w_timeout(Duration::from_millis(config.write_timeout_ms))
            .build();
        let collection = client
            .database(&config.database)
            .collection_with_options(
                &config.collection,
                CollectionOptions::builder()
                    .write_concern(write_concern)
                    .build(),
            );

        let store = Self { client, collection };
        store.log_connection_info().await;
        Ok(store)
    }

    async fn log_connection_info(&self) {
        match self
            .client
            .database("admin")
            .run_command(doc! { "buildInfo": 1 })
            .await
        {
            Ok(info) => {
                let version = info.get_str("version").unwrap_or("unknown");
                tracing::info!(version, "connected to MongoDB");
            }
            Err(error) => tracing::debug!(%error, "buildInfo unavailable"),
        }

        match self.replica_set_status().await {
            Ok(Some(summary)) => {
                tracing::info!(
                    set = %summary.set_name,
                    members = summary.members.len(),
                    "replica set active"
                );
                for member in &summary.members {
                    tracing::info!(name = %member.name, state = %member.state, "replica member");
                }
            }
            Ok(None) => tracing::info!("server is not part of a replica set"),
            Err(error) => tracing::debug!(%error, "replica set status unavailable"),
        }
    }

    /// Attempt one durable insert. A duplicate-key rejection is an expected
    /// outcome, not an error; anything else propagates for the caller to
    /// count as a per-document storage failure.
    pub async fn insert(&self, document: &StoredDocument) -> Result<InsertOutcome> {
        match self.collection.insert_one(document).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(error) if is_duplicate_key(&error) => Ok(InsertOutcome::Duplicate),
            Err(error) => Err(DbError::Insert(error.to_string()).into()),
        }
    }

    /// Live document count for the collection.
    pub async fn count(&self) -> Result<u64> {
        self.collection
            .count_documents(doc! {})
            .await
            .map_err(|e| DbError::Query(e.to_string()).into())
    }

    /// One arbitrary stored document, for shape auditing.
    pub async fn sample(&self) -> Result<Option<StoredDocument>> {
        self.collection
            .find_one(doc! {})
            .await
            .map_err(|e| DbError::Query(e.to_string()).into())
    }

    /// Distribution of embedding lengths across the collection, as sorted
    /// `(dimension, count)` pairs. A healthy collection has exactly one entry.
    pub async fn embedding_dimensions(&self) -> Result<Vec<(i64, u64)>> {
        let pipeline = vec![
            doc! { "$project": { "dimension": { "$size": "$embedding" } } },
            doc! { "$group": { "_id": "$dimension", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];

        let mut cursor = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        let mut distribution = Vec::new();
        while let Some(group) = cursor
            .try_next()
            .await
            .map_err(|e| DbError::Query(e.to_string()))?
        {
            let dimension = group
                .get_i32("_id")
                .map(i64::from)
                .or_else(|_| group.get_i64("_id"))
                .unwrap_or(-1);
            let count = group
                .get_i32("count")
                .map(i64::from)
                .or_else(|_| group.get_i64("count"))
                .unwrap_or(0);
            distribution.push((dimension, count.max(0) as u64));
        }

        Ok(distribution)
    }

    /// Number of documents missing a required field.
    pub async fn missing_field_count(&self, field: &str) -> Result<u64> {
        let mut filter = mongodb::bson::Document::new();
        filter.insert(field, doc! { "$exists": false });
        self.collection
            .count_documents(filter)
            .await
            .map_err(|e| DbError::Query(e.to_string()).into())
    }

    /// Create the text index used by downstream search, tolerating an index
    /// that already exists from a previous run.
    pub async fn create_indexes(&self) -> Result<()> {
        let model = IndexModel::builder()
            .keys(doc! { "text": "text" })
            .options(IndexOptions::builder().name("text_index".to_string()).build())
            .build();

        match self.collection.create_index(model).await {
            Ok(_) => {
                tracing::debug!("text index created");
                Ok(())
            }
            Err(error) => {
                let message = error.to_string();
                if message.contains("already exists") || message.contains("IndexOptionsConflict") {
                    tracing::trace!("text index already exists");
                    Ok(())
                } else {
                    Err(DbError::Query(format!("failed to create text index: {message}")).into())
                }
            }
        }
    }

    /// Replica set status, or `None` when the server is not a replica set
    /// member (standalone deployments answer this command with an error).
    pub async fn replica_set_status(&self) -> Result<Option<ReplicaSetSummary>> {
        let status = match self
            .client
            .database("admin")
            .run_command(doc! { "replSetGetStatus": 1 })
            .await
        {
            Ok(status) => status,
            Err(error) => {
                tracing::debug!(%error, "replSetGetStatus rejected");
                return Ok(None);
            }
        };

        let set_name = match status.get_str("set") {
            Ok(name) => name.to_string(),
            Err(_) => return Ok(None),
        };

        let members = status
            .get_array("members")
            .map(|members| {
                members
                    .iter()
                    .filter_map(|member| member.as_document())
                    .map(|member| ReplicaMember {
                        name: member.get_str("name").unwrap_or("unknown").to_string(),
                        state: member.get_str("stateStr").unwrap_or("UNKNOWN").to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(ReplicaSetSummary { set_name, members }))
    }
}

#[async_trait]
impl DocumentSink for DocumentStore {
    async fn insert(&self, document: &StoredDocument) -> Result<InsertOutcome> {
        DocumentStore::insert(self, document).await
    }

    async fn count(&self) -> Result<u64> {
        DocumentStore::count(self).await
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        *error.kind,
        ErrorKind::Write(WriteFailure::WriteError(WriteError {
            code: DUPLICATE_KEY_CODE,
            ..
        }))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_summary_counts_primaries() {
        let summary = ReplicaSetSummary {
            set_name: "rs".to_string(),
            members: vec![
                ReplicaMember {
                    name: "localhost:3001".to_string(),
                    state: "PRIMARY".to_string(),
                },
                ReplicaMember {
                    name: "localhost:3002".to_string(),
                    state: "SECONDARY".to_string(),
                },
                ReplicaMember {
                    name: "localhost:3003".to_string(),
                    state: "SECONDARY".to_string(),
                },
            ],
        };
        assert_eq!(summary.primary_count(), 1);
    }
}
