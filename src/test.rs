//! Shared test harness and cross-module scenarios.

use std::collections::VecDeque;

use crate::{
    bson::Document,
    error::Result,
    options::WriteModel,
    transport::{StreamDescription, WriteTransport},
};

/// An in-memory transport that replays scripted replies and records every batch it is
/// asked to execute.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    description: StreamDescription,
    replies: VecDeque<Result<Document>>,
    pub(crate) batches: Vec<Vec<WriteModel>>,
}

impl ScriptedTransport {
    pub(crate) fn new(description: StreamDescription, replies: Vec<Result<Document>>) -> Self {
        Self {
            description,
            replies: replies.into(),
            batches: Vec::new(),
        }
    }
}

impl WriteTransport for ScriptedTransport {
    fn stream_description(&self) -> &StreamDescription {
        &self.description
    }

    fn execute_batch(&mut self, models: &[WriteModel], _ordered: bool) -> Result<Document> {
        self.batches.push(models.to_vec());
        self.replies
            .pop_front()
            .expect("scripted transport ran out of replies")
    }
}

mod prose {
    use pretty_assertions::assert_eq;

    use super::ScriptedTransport;
    use crate::{
        bson::doc,
        client::WriteClient,
        error::{ErrorKind, RETRYABLE_WRITE_ERROR},
        options::{Hint, WriteModel},
        transport::StreamDescription,
    };

    // Modeled on the retryable-writes prose scenario: a failCommand-style reply with a
    // write concern error labeled RetryableWriteError must surface the label through the
    // bulk-shaped insert error.
    #[test]
    fn insert_many_surfaces_write_concern_error_label() {
        let transport = ScriptedTransport::new(
            StreamDescription::new_testing(),
            vec![Ok(doc! {
                "ok": 1,
                "nInserted": 1_i64,
                "writeConcernError": {
                    "code": 91,
                    "codeName": "ShutdownInProgress",
                    "errmsg": "Replication is being shut down",
                    "errorLabels": [RETRYABLE_WRITE_ERROR],
                },
            })],
        );
        let mut client = WriteClient::new(transport);

        let error = client.insert_many(vec![doc! { "x": 1 }]).unwrap_err();

        assert!(error.contains_label(RETRYABLE_WRITE_ERROR));
        assert!(error.is_write_retryable());
        match error.kind.as_ref() {
            ErrorKind::BulkWrite(failure) => {
                assert_eq!(
                    failure.write_concern_error.as_ref().map(|e| e.code),
                    Some(91)
                );
                assert_eq!(
                    failure.partial_result.as_ref().map(|r| r.inserted_count),
                    Some(1)
                );
            }
            other => panic!("expected bulk write error, got {:?}", other),
        }
    }

    #[test]
    fn bulk_write_hint_against_old_server_never_dispatches() {
        let transport = ScriptedTransport::new(StreamDescription::with_wire_version(4), vec![]);
        let mut client = WriteClient::new(transport);

        let models = vec![
            WriteModel::InsertOne {
                document: doc! { "x": 1 },
            },
            WriteModel::UpdateOne {
                filter: doc! { "x": 1 },
                update: doc! { "$set": { "x": 2 } },
                upsert: None,
                array_filters: None,
                hint: Some(Hint::Name("_id_".to_string())),
            },
        ];
        let error = client.bulk_write(models).run().unwrap_err();

        assert_eq!(
            error.kind.to_string(),
            "the 'hint' command parameter requires a minimum server wire version of 5"
        );
        assert!(client.into_inner().batches.is_empty());
    }
}
