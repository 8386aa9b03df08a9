use async_trait::async_trait;

use super::collection::Collection;
use super::record::Document;
use super::DatabaseError;
use crate::filter::Filter;

/// One write inside an all-or-nothing batch
#[derive(Debug, Clone)]
pub enum Write {
    Insert {
        collection: Collection,
        doc: Document,
    },
    /// Shallow merge of `changes` into the stored document
    Update {
        collection: Collection,
        id: String,
        changes: Document,
    },
}

impl Write {
    pub fn insert(collection: Collection, doc: Document) -> Self {
        Write::Insert { collection, doc }
    }

    pub fn update(collection: Collection, id: impl Into<String>, changes: Document) -> Self {
        Write::Update { collection, id: id.into(), changes }
    }
}

/// Storage for every collection. Queries go through `Filter`, so both
/// backends share the soft-delete default and the where semantics.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError>;

    /// Matching documents, ignoring limit and offset
    async fn count(&self, collection: Collection, filter: &Filter) -> Result<i64, DatabaseError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        let mut single = filter.clone();
        single.limit(1, None)?;
        Ok(self.find(collection, &single).await?.into_iter().next())
    }

    /// Raw lookup by id. Soft-deleted documents are returned too; callers
    /// decide what a deleted record means for them.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DatabaseError>;

    /// Fails with `Conflict` when the id is already taken
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError>;

    /// Fails with `NotFound` when no document has this id
    async fn update(&self, collection: Collection, id: &str, changes: Document) -> Result<Document, DatabaseError>;

    /// Apply every write or none of them; returns the resulting documents
    /// in the order of `writes`
    async fn apply_batch(&self, writes: Vec<Write>) -> Result<Vec<Document>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Id of a document about to be inserted
pub(crate) fn document_id(doc: &Document) -> Result<String, DatabaseError> {
    doc.get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| DatabaseError::QueryError("document has no string id".to_string()))
}

pub(crate) fn merge_changes(target: &mut Document, changes: Document) {
    for (key, value) in changes {
        target.insert(key, value);
    }
}
