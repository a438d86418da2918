//! Deserialization views over raw server replies and the classification of those replies
//! into successes and write failures.

use std::ops::Deref;

use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    bson::{Bson, Document},
    bson_util,
    error::{
        BulkWriteError,
        CommandError,
        Error,
        ErrorKind,
        IndexedWriteError,
        Result,
        WriteConcernError,
    },
    results::BulkWriteResult,
};

/// A response body useful for deserializing command errors.
#[derive(Deserialize, Debug)]
pub(crate) struct CommandErrorBody {
    #[serde(rename = "errorLabels")]
    pub(crate) error_labels: Option<Vec<String>>,

    #[serde(flatten)]
    pub(crate) command_error: CommandError,
}

impl From<CommandErrorBody> for Error {
    fn from(command_error_response: CommandErrorBody) -> Error {
        Error::new(
            ErrorKind::Command(command_error_response.command_error),
            command_error_response.error_labels,
        )
    }
}

/// A body for replies that carry nothing beyond the standard write response fields.
#[derive(Deserialize, Debug)]
pub(crate) struct EmptyBody {}

/// A response to a write command, generic over an operation-specific body flattened into
/// the same document.
#[derive(Deserialize, Debug)]
pub(crate) struct WriteResponseBody<T = EmptyBody> {
    #[serde(flatten)]
    body: T,

    #[serde(default)]
    n: u64,

    #[serde(rename = "writeErrors")]
    write_errors: Option<Vec<IndexedWriteError>>,

    #[serde(rename = "writeConcernError")]
    write_concern_error: Option<WriteConcernError>,

    #[serde(rename = "errorLabels")]
    labels: Option<Vec<String>>,
}

impl<T: DeserializeOwned> WriteResponseBody<T> {
    /// Interprets a raw reply document. An `ok: 0` reply classifies as a top-level command
    /// error; anything else deserializes into the response body, with absent fields
    /// defaulting rather than erroring.
    pub(crate) fn from_reply(reply: Document) -> Result<Self> {
        let ok = reply
            .get("ok")
            .and_then(bson_util::get_int)
            .ok_or_else(|| ErrorKind::InvalidResponse {
                message: format!("missing 'ok' field in server reply: {}", reply),
            })?;
        if ok != 1 {
            let error_response: CommandErrorBody =
                crate::bson::from_document(reply).map_err(|e| ErrorKind::InvalidResponse {
                    message: format!("invalid server error response: {}", e),
                })?;
            return Err(error_response.into());
        }
        Ok(crate::bson::from_document(reply)?)
    }
}

impl<T> WriteResponseBody<T> {
    /// Returns an error if this response indicates anything other than full success: any
    /// per-item write errors, a write concern error, or a non-empty top-level label set.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.write_errors.is_none()
            && self.write_concern_error.is_none()
            && self.labels.as_ref().map(|l| l.is_empty()).unwrap_or(true)
        {
            return Ok(());
        }
        let failure = BulkWriteError {
            write_errors: self.write_errors.clone().unwrap_or_default(),
            write_concern_error: self.write_concern_error.clone(),
            partial_result: None,
        };
        Err(Error::new(
            ErrorKind::BulkWrite(failure),
            self.labels.clone(),
        ))
    }

    /// The number of documents affected, as reported by the server.
    pub(crate) fn n(&self) -> u64 {
        self.n
    }
}

impl<T> Deref for WriteResponseBody<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.body
    }
}

/// The summary count fields of a batched write reply.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryBody {
    #[serde(default)]
    pub(crate) n_inserted: i64,

    #[serde(default)]
    pub(crate) n_matched: i64,

    #[serde(default)]
    pub(crate) n_modified: i64,

    #[serde(default)]
    pub(crate) n_upserted: i64,

    #[serde(default)]
    pub(crate) n_deleted: i64,
}

impl SummaryBody {
    pub(crate) fn to_result(&self) -> BulkWriteResult {
        BulkWriteResult {
            inserted_count: self.n_inserted,
            matched_count: self.n_matched,
            modified_count: self.n_modified,
            upserted_count: self.n_upserted,
            deleted_count: self.n_deleted,
        }
    }
}

/// The update-specific fields of an update or replace reply.
#[derive(Deserialize, Debug)]
pub(crate) struct UpdateBody {
    #[serde(rename = "nModified", default)]
    pub(crate) n_modified: u64,

    pub(crate) upserted: Option<Vec<Document>>,
}

impl UpdateBody {
    pub(crate) fn upserted_id(&self) -> Option<Bson> {
        self.upserted
            .as_ref()
            .and_then(|upserted| upserted.first())
            .and_then(|doc| doc.get("_id"))
            .cloned()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{EmptyBody, SummaryBody, UpdateBody, WriteResponseBody};
    use crate::{
        bson::{doc, Bson},
        error::{ErrorKind, WriteFailure},
    };

    #[test]
    fn successful_reply_validates() {
        let reply = doc! { "ok": 1, "n": 3 };
        let response = WriteResponseBody::<EmptyBody>::from_reply(reply).unwrap();
        assert!(response.validate().is_ok());
        assert_eq!(response.n(), 3);
    }

    #[test]
    fn labels_union_top_level_and_write_concern() {
        let reply = doc! {
            "ok": 1,
            "n": 1,
            "writeConcernError": {
                "code": 64,
                "codeName": "WriteConcernFailed",
                "errmsg": "waiting for replication timed out",
                "errorLabels": ["RetryableWriteError", "ExampleError"],
            },
            "errorLabels": ["ExampleError", "TopLevelOnly"],
        };
        let response = WriteResponseBody::<EmptyBody>::from_reply(reply).unwrap();
        let error = response.validate().unwrap_err();

        assert!(error.contains_label("RetryableWriteError"));
        assert!(error.contains_label("ExampleError"));
        assert!(error.contains_label("TopLevelOnly"));
        assert_eq!(error.labels().len(), 3);
    }

    #[test]
    fn write_error_fields_copied_verbatim() {
        let reply = doc! {
            "ok": 1,
            "n": 0,
            "writeErrors": [
                { "index": 2, "code": 11000, "errmsg": "E11000 duplicate key" },
            ],
        };
        let response = WriteResponseBody::<EmptyBody>::from_reply(reply).unwrap();
        let error = response.validate().unwrap_err();

        match error.kind.as_ref() {
            ErrorKind::BulkWrite(failure) => {
                assert_eq!(failure.write_errors.len(), 1);
                assert_eq!(failure.write_errors[0].index, 2);
                assert_eq!(failure.write_errors[0].code, 11000);
                assert_eq!(failure.write_errors[0].message, "E11000 duplicate key");
                assert_eq!(failure.write_errors[0].code_name, None);
            }
            other => panic!("expected bulk write error, got {:?}", other),
        }
    }

    #[test]
    fn ok_zero_classifies_as_command_error() {
        let reply = doc! {
            "ok": 0,
            "code": 8000,
            "codeName": "AtlasError",
            "errmsg": "bad auth",
            "errorLabels": ["HandshakeError"],
        };
        let error = WriteResponseBody::<EmptyBody>::from_reply(reply).unwrap_err();

        match error.kind.as_ref() {
            ErrorKind::Command(command_error) => {
                assert_eq!(command_error.code, 8000);
                assert_eq!(command_error.code_name, "AtlasError");
                assert_eq!(command_error.message, "bad auth");
            }
            other => panic!("expected command error, got {:?}", other),
        }
        assert!(error.contains_label("HandshakeError"));
    }

    #[test]
    fn labels_without_errors_still_raise() {
        let reply = doc! { "ok": 1, "n": 1, "errorLabels": ["ExampleError"] };
        let response = WriteResponseBody::<EmptyBody>::from_reply(reply).unwrap();
        let error = response.validate().unwrap_err();

        assert!(error.contains_label("ExampleError"));
        match error.kind.as_ref() {
            ErrorKind::BulkWrite(failure) => {
                assert!(failure.write_errors.is_empty());
                assert!(failure.write_concern_error.is_none());
            }
            other => panic!("expected bulk write error, got {:?}", other),
        }
    }

    #[test]
    fn write_concern_error_surfaces_single_write_shape() {
        let reply = doc! {
            "ok": 1,
            "n": 1,
            "writeConcernError": {
                "code": 91,
                "codeName": "ShutdownInProgress",
                "errmsg": "shutting down",
            },
        };
        let response = WriteResponseBody::<EmptyBody>::from_reply(reply).unwrap();
        let error = response.validate().unwrap_err();
        let error = crate::error::convert_bulk_errors(error);

        match error.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteConcernError(wc_error)) => {
                assert_eq!(wc_error.code, 91);
            }
            other => panic!("expected write concern error, got {:?}", other),
        }
    }

    #[test]
    fn summary_and_update_bodies_deserialize() {
        let reply = doc! {
            "ok": 1,
            "nInserted": 2_i64,
            "nMatched": 1_i64,
            "nModified": 1_i64,
            "nUpserted": 0_i64,
            "nDeleted": 3_i64,
        };
        let response = WriteResponseBody::<SummaryBody>::from_reply(reply).unwrap();
        let result = response.to_result();
        assert_eq!(result.inserted_count, 2);
        assert_eq!(result.deleted_count, 3);

        let reply = doc! {
            "ok": 1,
            "n": 1,
            "nModified": 0,
            "upserted": [ { "index": 0, "_id": 42 } ],
        };
        let response = WriteResponseBody::<UpdateBody>::from_reply(reply).unwrap();
        assert_eq!(response.n_modified, 0);
        assert_eq!(response.upserted_id(), Some(Bson::Int32(42)));
    }

    #[test]
    fn missing_ok_is_invalid_response() {
        let error = WriteResponseBody::<EmptyBody>::from_reply(doc! { "n": 1 }).unwrap_err();
        assert!(matches!(
            error.kind.as_ref(),
            ErrorKind::InvalidResponse { .. }
        ));
    }
}
