use crate::{
    error::{IndexedWriteError, WriteConcernError},
    results::BulkWriteResult,
};

/// An error that occurred while executing a write operation consisting of multiple writes.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct BulkWriteError {
    /// The errors that occurred for individual writes, ordered by the index of the model
    /// that produced them. Models that were never attempted do not appear here.
    pub write_errors: Vec<IndexedWriteError>,

    /// The write concern error that occurred, if any. At most one per operation.
    pub write_concern_error: Option<WriteConcernError>,

    /// The results of any writes that completed before the error occurred.
    pub partial_result: Option<BulkWriteResult>,
}

impl BulkWriteError {
    pub(crate) fn merge(&mut self, other: BulkWriteError) {
        self.write_errors.extend(other.write_errors);
        if let Some(write_concern_error) = other.write_concern_error {
            self.write_concern_error = Some(write_concern_error);
        }
        if let Some(other_partial_result) = other.partial_result {
            self.merge_partial_results(other_partial_result);
        }
    }

    pub(crate) fn merge_partial_results(&mut self, other_partial_result: BulkWriteResult) {
        match self.partial_result.as_mut() {
            Some(partial_result) => partial_result.merge(other_partial_result),
            None => self.partial_result = Some(other_partial_result),
        }
    }
}
