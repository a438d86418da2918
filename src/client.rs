//! The front door for single write operations and bulk write construction.

use serde::de::DeserializeOwned;

use crate::{
    bulk_write::BulkWrite,
    capability,
    error::{convert_bulk_errors, Result},
    operation::{EmptyBody, UpdateBody, WriteResponseBody},
    options::{DeleteOptions, ReplaceOptions, UpdateOptions, WriteModel},
    results::{BulkWriteResult, DeleteResult, UpdateResult},
    transport::WriteTransport,
};
use crate::bson::Document;

/// Executes write operations against a single logical collection over a caller-supplied
/// transport. Single operations report failures as [`ErrorKind::Write`](crate::ErrorKind);
/// `insert_many` and [`bulk_write`](WriteClient::bulk_write) report the batched
/// [`ErrorKind::BulkWrite`](crate::ErrorKind) shape.
#[derive(Debug)]
pub struct WriteClient<T: WriteTransport> {
    transport: T,
}

impl<T: WriteTransport> WriteClient<T> {
    /// Creates a client over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Consumes the client, returning the underlying transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Updates up to one document matching `filter`.
    pub fn update_one(
        &mut self,
        filter: Document,
        update: Document,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<UpdateResult> {
        self.update_common(filter, update, options.into(), false)
    }

    /// Updates all documents matching `filter`.
    pub fn update_many(
        &mut self,
        filter: Document,
        update: Document,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<UpdateResult> {
        self.update_common(filter, update, options.into(), true)
    }

    fn update_common(
        &mut self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
        multi: bool,
    ) -> Result<UpdateResult> {
        let options = options.unwrap_or_default();
        let model = if multi {
            WriteModel::UpdateMany {
                filter,
                update,
                upsert: options.upsert,
                array_filters: options.array_filters,
                hint: options.hint,
            }
        } else {
            WriteModel::UpdateOne {
                filter,
                update,
                upsert: options.upsert,
                array_filters: options.array_filters,
                hint: options.hint,
            }
        };
        let response = self.execute_single::<UpdateBody>(model)?;
        Ok(finish_update(response))
    }

    /// Replaces up to one document matching `filter` with `replacement`.
    pub fn replace_one(
        &mut self,
        filter: Document,
        replacement: Document,
        options: impl Into<Option<ReplaceOptions>>,
    ) -> Result<UpdateResult> {
        let options = options.into().unwrap_or_default();
        let model = WriteModel::ReplaceOne {
            filter,
            replacement,
            upsert: options.upsert,
            hint: options.hint,
        };
        let response = self.execute_single::<UpdateBody>(model)?;
        Ok(finish_update(response))
    }

    /// Deletes up to one document matching `filter`.
    pub fn delete_one(
        &mut self,
        filter: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Result<DeleteResult> {
        let options = options.into().unwrap_or_default();
        self.delete_common(WriteModel::DeleteOne {
            filter,
            hint: options.hint,
        })
    }

    /// Deletes all documents matching `filter`.
    pub fn delete_many(
        &mut self,
        filter: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Result<DeleteResult> {
        let options = options.into().unwrap_or_default();
        self.delete_common(WriteModel::DeleteMany {
            filter,
            hint: options.hint,
        })
    }

    fn delete_common(&mut self, model: WriteModel) -> Result<DeleteResult> {
        let response = self.execute_single::<EmptyBody>(model)?;
        Ok(DeleteResult {
            deleted_count: response.n(),
        })
    }

    /// Inserts the given documents. Failures carry the batched
    /// [`ErrorKind::BulkWrite`](crate::ErrorKind) shape with per-document indices.
    pub fn insert_many(
        &mut self,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<BulkWriteResult> {
        let models = documents
            .into_iter()
            .map(|document| WriteModel::InsertOne { document })
            .collect();
        BulkWrite::new(&mut self.transport, models).run()
    }

    /// Begins a bulk write of the given models. Call [`run`](BulkWrite::run) to dispatch
    /// it.
    pub fn bulk_write(&mut self, models: Vec<WriteModel>) -> BulkWrite<'_, T> {
        BulkWrite::new(&mut self.transport, models)
    }

    /// Runs a one-model batch, converting bulk-shaped failures to the single-write shape.
    fn execute_single<B: DeserializeOwned>(
        &mut self,
        model: WriteModel,
    ) -> Result<WriteResponseBody<B>> {
        capability::validate_model(&model, self.transport.stream_description())?;
        let reply = self
            .transport
            .execute_batch(std::slice::from_ref(&model), true)?;
        let response = WriteResponseBody::<B>::from_reply(reply)?;
        response.validate().map_err(convert_bulk_errors)?;
        Ok(response)
    }
}

fn finish_update(response: WriteResponseBody<UpdateBody>) -> UpdateResult {
    let upserted_id = response.upserted_id();
    let matched_count = if upserted_id.is_some() {
        0
    } else {
        response.n()
    };
    UpdateResult {
        matched_count,
        modified_count: response.n_modified,
        upserted_id,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::WriteClient;
    use crate::{
        bson::{doc, Bson},
        error::{ErrorKind, WriteFailure},
        options::{DeleteOptions, Hint, UpdateOptions},
        test::ScriptedTransport,
        transport::StreamDescription,
    };

    #[test]
    fn hint_on_old_server_fails_before_dispatch() {
        let transport = ScriptedTransport::new(StreamDescription::with_wire_version(4), vec![]);
        let mut client = WriteClient::new(transport);

        let options = UpdateOptions {
            hint: Some(Hint::Name("_id_".to_string())),
            ..Default::default()
        };
        let error = client
            .update_one(doc! {}, doc! { "$set": { "x": 1 } }, options)
            .unwrap_err();

        assert_eq!(
            error.kind.to_string(),
            "the 'hint' command parameter requires a minimum server wire version of 5"
        );
        assert!(client.into_inner().batches.is_empty());
    }

    #[test]
    fn hinted_replace_dispatches_on_new_server() {
        let transport = ScriptedTransport::new(
            StreamDescription::with_wire_version(5),
            vec![Ok(doc! { "ok": 1, "n": 1, "nModified": 1 })],
        );
        let mut client = WriteClient::new(transport);

        let options = crate::options::ReplaceOptions {
            hint: Some(Hint::Keys(doc! { "x": 1 })),
            ..Default::default()
        };
        let result = client
            .replace_one(doc! { "x": 1 }, doc! { "x": 2 }, options)
            .unwrap();

        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 1);
        assert_eq!(client.into_inner().batches.len(), 1);
    }

    #[test]
    fn delete_write_concern_error_uses_single_write_shape() {
        let transport = ScriptedTransport::new(
            StreamDescription::new_testing(),
            vec![Ok(doc! {
                "ok": 1,
                "n": 1,
                "writeConcernError": {
                    "code": 91,
                    "codeName": "ShutdownInProgress",
                    "errmsg": "shutting down",
                    "errorLabels": ["RetryableWriteError"],
                },
            })],
        );
        let mut client = WriteClient::new(transport);

        let error = client.delete_one(doc! { "x": 1 }, None).unwrap_err();

        match error.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteConcernError(wc_error)) => {
                assert_eq!(wc_error.code, 91);
            }
            other => panic!("expected write concern error, got {:?}", other),
        }
        assert!(error.contains_label("RetryableWriteError"));
    }

    #[test]
    fn upsert_reports_zero_matched() {
        let transport = ScriptedTransport::new(
            StreamDescription::new_testing(),
            vec![Ok(doc! {
                "ok": 1,
                "n": 1,
                "nModified": 0,
                "upserted": [ { "index": 0, "_id": 7 } ],
            })],
        );
        let mut client = WriteClient::new(transport);

        let result = client
            .update_one(doc! { "x": 1 }, doc! { "$set": { "x": 2 } }, None)
            .unwrap();

        assert_eq!(result.matched_count, 0);
        assert_eq!(result.modified_count, 0);
        assert_eq!(result.upserted_id, Some(Bson::Int32(7)));
    }

    #[test]
    fn delete_many_reports_count() {
        let transport = ScriptedTransport::new(
            StreamDescription::new_testing(),
            vec![Ok(doc! { "ok": 1, "n": 5 })],
        );
        let mut client = WriteClient::new(transport);

        let result = client
            .delete_many(doc! {}, DeleteOptions::default())
            .unwrap();
        assert_eq!(result.deleted_count, 5);
    }
}
