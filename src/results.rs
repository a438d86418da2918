//! Contains the types of results returned by write operations.

use serde::Serialize;

use crate::bson::Bson;

/// The summary counts accumulated across an entire bulk write.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct BulkWriteResult {
    /// The total number of documents inserted.
    pub inserted_count: i64,

    /// The total number of documents matched.
    pub matched_count: i64,

    /// The total number of documents modified.
    pub modified_count: i64,

    /// The total number of documents upserted.
    pub upserted_count: i64,

    /// The total number of documents deleted.
    pub deleted_count: i64,
}

impl BulkWriteResult {
    pub(crate) fn merge(&mut self, other: Self) {
        let BulkWriteResult {
            inserted_count,
            matched_count,
            modified_count,
            upserted_count,
            deleted_count,
        } = other;
        self.inserted_count += inserted_count;
        self.matched_count += matched_count;
        self.modified_count += modified_count;
        self.upserted_count += upserted_count;
        self.deleted_count += deleted_count;
    }

    pub(crate) fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The result of an update operation.
#[derive(Clone, Debug, Serialize)]
#[non_exhaustive]
pub struct UpdateResult {
    /// The number of documents that matched the filter. Zero when the operation resulted
    /// in an upsert.
    pub matched_count: u64,

    /// The number of documents that were modified by the operation.
    pub modified_count: u64,

    /// The `_id` field of the upserted document, if an upsert took place.
    pub upserted_id: Option<Bson>,
}

/// The result of a delete operation.
#[derive(Clone, Debug, Serialize)]
#[non_exhaustive]
pub struct DeleteResult {
    /// The number of documents deleted by the operation.
    pub deleted_count: u64,
}
