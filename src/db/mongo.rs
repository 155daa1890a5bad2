//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::CivicError;

/// Server error code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Whether a driver error is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, CivicError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| CivicError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CivicError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, CivicError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, CivicError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), CivicError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| CivicError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    fn stamp(item: &mut T) {
        let metadata = item.mut_metadata();
        let now = DateTime::now();
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, CivicError> {
        Self::stamp(&mut item);

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| CivicError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| CivicError::Database("Failed to get inserted ID".into()))
    }

    /// Insert a document guarded by a unique index.
    ///
    /// Returns `None` when the index rejected the document; any other
    /// failure is an error.
    pub async fn insert_unique(&self, mut item: T) -> Result<Option<ObjectId>, CivicError> {
        Self::stamp(&mut item);

        match self.inner.insert_one(item).await {
            Ok(result) => result
                .inserted_id
                .as_object_id()
                .map(Some)
                .ok_or_else(|| CivicError::Database("Failed to get inserted ID".into())),
            Err(e) if is_duplicate_key(&e) => Ok(None),
            Err(e) => Err(CivicError::Database(format!("Insert failed: {}", e))),
        }
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, CivicError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| CivicError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter, optionally sorted and paged
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
        skip: Option<u64>,
        limit: Option<i64>,
    ) -> Result<Vec<T>, CivicError> {
        let mut find = self.inner.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        if let Some(skip) = skip {
            find = find.skip(skip);
        }
        if let Some(limit) = limit {
            find = find.limit(limit);
        }

        let cursor = find
            .await
            .map_err(|e| CivicError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| CivicError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Count documents matching a filter
    pub async fn count(&self, filter: Document) -> Result<u64, CivicError> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| CivicError::Database(format!("Count failed: {}", e)))
    }

    /// Atomically update the first document matching `filter` and return
    /// the updated version; `None` when nothing matched.
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<T>, CivicError> {
        let modifications = with_updated_at(UpdateModifications::Document(update));

        self.inner
            .find_one_and_update(filter, modifications)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| CivicError::Database(format!("Update failed: {}", e)))
    }

    /// Hard delete one document; returns whether anything was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool, CivicError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| CivicError::Database(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count > 0)
    }

    /// Hard delete every matching document
    pub async fn delete_many(&self, filter: Document) -> Result<u64, CivicError> {
        let result = self
            .inner
            .delete_many(filter)
            .await
            .map_err(|e| CivicError::Database(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count)
    }

    /// Run an aggregation pipeline and collect the raw result documents
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>, CivicError> {
        let cursor = self
            .inner
            .aggregate(pipeline)
            .await
            .map_err(|e| CivicError::Database(format!("Aggregate failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| CivicError::Database(format!("Cursor read failed: {}", e)))
    }
}

/// Merge `metadata.updated_at` into a `$set` stage
fn with_updated_at(update: UpdateModifications) -> UpdateModifications {
    match update {
        UpdateModifications::Document(mut update) => {
            let now = DateTime::now();
            match update.get_document_mut("$set") {
                Ok(set) => {
                    set.insert("metadata.updated_at", now);
                }
                Err(_) => {
                    update.insert("$set", doc! { "metadata.updated_at": now });
                }
            }
            UpdateModifications::Document(update)
        }
        pipeline => pipeline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated_at_added_to_existing_set() {
        let update = doc! { "$set": { "title": "New" }, "$inc": { "signature_count": 1 } };
        match with_updated_at(UpdateModifications::Document(update)) {
            UpdateModifications::Document(d) => {
                let set = d.get_document("$set").unwrap();
                assert!(set.contains_key("title"));
                assert!(set.contains_key("metadata.updated_at"));
                assert!(d.contains_key("$inc"));
            }
            _ => panic!("expected document update"),
        }
    }

    #[test]
    fn test_updated_at_creates_set_stage() {
        let update = doc! { "$inc": { "signature_count": 1 } };
        match with_updated_at(UpdateModifications::Document(update)) {
            UpdateModifications::Document(d) => {
                assert!(d.get_document("$set").unwrap().contains_key("metadata.updated_at"));
            }
            _ => panic!("expected document update"),
        }
    }
}
