//! Contains the `Error` and `Result` types that `mongodb-write-core` uses.

pub(crate) mod bulk_write;

use std::{collections::HashSet, fmt, sync::Arc};

use serde::Deserialize;
use thiserror::Error;

use crate::bson::Document;

pub use bulk_write::BulkWriteError;

const RETRYABLE_WRITE_CODES: [i32; 12] = [
    11600, 11602, 10107, 13435, 13436, 189, 91, 7, 6, 89, 9001, 262,
];

/// Retryable write error label. This label will be added to an error when the error is
/// write-retryable.
pub const RETRYABLE_WRITE_ERROR: &str = "RetryableWriteError";
/// Transient transaction error label. This label will be added to a network error or server
/// selection error that occurs during a transaction.
pub const TRANSIENT_TRANSACTION_ERROR: &str = "TransientTransactionError";
/// Unknown transaction commit result error label. This label will be added to a server selection
/// error, network error, write-retryable error, MaxTimeMSExpired error, or write concern
/// failed/timeout during a commitTransaction.
pub const UNKNOWN_TRANSACTION_COMMIT_RESULT: &str = "UnknownTransactionCommitResult";

/// The result type for all methods that can return an error in the `mongodb-write-core` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An immutable set of error labels. Labels are attached to an [`Error`] when it is
/// constructed from a server reply and classify the failure for retry and transaction
/// layers; equality is set equality, so the order labels arrived in does not matter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorLabels(HashSet<String>);

impl ErrorLabels {
    /// Creates an empty label set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set contains the given label.
    pub fn contains(&self, label: impl AsRef<str>) -> bool {
        self.0.contains(label.as_ref())
    }

    /// Returns the union of this set and `other`. Duplicates collapse.
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().cloned());
        Self(merged)
    }

    /// Iterates over the labels in an unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The number of labels in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, label: String) {
        self.0.insert(label);
    }
}

impl FromIterator<String> for ErrorLabels {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for ErrorLabels {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(String::from).collect())
    }
}

impl Extend<String> for ErrorLabels {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for ErrorLabels {
    type Item = String;
    type IntoIter = std::collections::hash_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An error that can occur in the `mongodb-write-core` crate. The inner [`ErrorKind`] is
/// boxed to keep the type small enough to pass through `Result` cheaply.
#[derive(Clone, Debug, Error)]
#[error("Kind: {kind}, labels: {labels:?}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,

    pub(crate) labels: ErrorLabels,

    #[source]
    pub(crate) source: Option<Box<Error>>,
}

impl Error {
    /// Constructs an error from a kind and the top-level labels reported alongside it.
    /// Labels attached to a write concern error inside `kind` are merged in, so the final
    /// set is the union of the top-level and write-concern-error labels.
    pub(crate) fn new(kind: ErrorKind, labels: Option<impl IntoIterator<Item = String>>) -> Self {
        let mut labels: ErrorLabels = labels
            .map(|labels| labels.into_iter().collect())
            .unwrap_or_default();
        if let Some(wc_error) = kind.get_write_concern_error() {
            labels.extend(wc_error.labels.iter().cloned());
        }
        Self {
            kind: Box::new(kind),
            labels,
            source: None,
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            message: message.into(),
        }
        .into()
    }

    /// Returns the labels for this error.
    pub fn labels(&self) -> &ErrorLabels {
        &self.labels
    }

    /// Whether this error contains the specified label.
    pub fn contains_label<T: AsRef<str>>(&self, label: T) -> bool {
        let label = label.as_ref();
        self.labels.contains(label)
            || self
                .source
                .as_ref()
                .map(|source| source.contains_label(label))
                .unwrap_or(false)
    }

    /// Returns a copy of this error with the specified label added. Intended for retry and
    /// transaction layers that classify an error after this crate has constructed it.
    pub fn with_label<T: AsRef<str>>(mut self, label: T) -> Self {
        self.labels.insert(label.as_ref().to_string());
        self
    }

    pub(crate) fn with_source<E: Into<Option<Error>>>(mut self, source: E) -> Self {
        self.source = source.into().map(Box::new);
        self
    }

    /// Whether this error originated below the reply classifier, i.e. the request never
    /// produced a classifiable reply.
    pub fn is_network_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Io(..))
    }

    /// Whether a write operation should be retried if this error occurs.
    pub fn is_write_retryable(&self) -> bool {
        self.contains_label(RETRYABLE_WRITE_ERROR)
    }

    /// Whether a "RetryableWriteError" label should be added to this error. If max_wire_version
    /// indicates a 4.4+ server, a label should only be added if the error is a network error.
    /// Otherwise, a label should be added if the error is a network error or the error code
    /// matches one of the retryable write codes.
    pub fn should_add_retryable_write_label(&self, max_wire_version: i32) -> bool {
        if max_wire_version > 8 {
            return self.is_network_error();
        }
        if self.is_network_error() {
            return true;
        }
        match self.code() {
            Some(code) => RETRYABLE_WRITE_CODES.contains(&code),
            None => false,
        }
    }

    /// Gets the code from this error, if applicable. Codes contained in per-item write
    /// errors are ignored; write concern error codes are consulted, matching the
    /// retryability rules this feeds.
    fn code(&self) -> Option<i32> {
        match self.kind.as_ref() {
            ErrorKind::Command(command_error) => Some(command_error.code),
            ErrorKind::Write(WriteFailure::WriteConcernError(wc_error)) => Some(wc_error.code),
            ErrorKind::BulkWrite(bulk_error) => bulk_error
                .write_concern_error
                .as_ref()
                .map(|wc_error| wc_error.code),
            _ => None,
        }
        .or_else(|| self.source.as_ref().and_then(|source| source.code()))
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Error::new(err.into(), None::<Option<String>>)
    }
}

impl From<crate::bson::de::Error> for ErrorKind {
    fn from(err: crate::bson::de::Error) -> Self {
        Self::BsonDeserialization(err)
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// The types of errors that can occur. Callers distinguish write failures, bulk write
/// failures, and pre-flight validation failures by matching on this enum rather than on
/// runtime type identity.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An invalid argument was provided.
    #[error("An invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    /// Wrapper around `bson::de::Error`.
    #[error("{0}")]
    BsonDeserialization(crate::bson::de::Error),

    /// The server returned an error to an attempted operation.
    #[error("Command failed: {0}")]
    Command(CommandError),

    /// The server does not support the operation or one of its parameters. Raised before
    /// any request is sent.
    #[error("{message}")]
    #[non_exhaustive]
    IncompatibleServer { message: String },

    /// The server returned an invalid reply to a database operation.
    #[error("The server returned an invalid reply to a database operation: {message}")]
    #[non_exhaustive]
    InvalidResponse { message: String },

    /// Wrapper around [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// An error occurred when trying to execute a write operation.
    #[error("An error occurred when trying to execute a write operation: {0:?}")]
    Write(WriteFailure),

    /// An error occurred when trying to execute a write operation consisting of multiple
    /// writes.
    #[error("An error occurred when trying to execute a batched write operation: {0:?}")]
    BulkWrite(BulkWriteError),
}

impl ErrorKind {
    fn get_write_concern_error(&self) -> Option<&WriteConcernError> {
        match self {
            ErrorKind::BulkWrite(BulkWriteError {
                write_concern_error,
                ..
            }) => write_concern_error.as_ref(),
            ErrorKind::Write(WriteFailure::WriteConcernError(err)) => Some(err),
            _ => None,
        }
    }
}

/// An error that occurred due to a database command failing.
#[derive(Clone, Debug, Deserialize)]
#[non_exhaustive]
pub struct CommandError {
    /// Identifies the type of error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "Error code {} ({}): {}",
            self.code, self.code_name, self.message
        )
    }
}

/// An error that occurred due to not being able to satisfy a write concern.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteConcernError {
    /// Identifies the type of write concern error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,

    /// A document identifying the write concern setting related to the error.
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,

    /// Labels categorizing the error. Merged into the owning [`Error`]'s label set on
    /// construction.
    #[serde(rename = "errorLabels", default)]
    pub(crate) labels: Vec<String>,
}

/// An error that occurred during a write operation that wasn't due to being unable to
/// satisfy a write concern.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteError {
    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    ///
    /// Note that the server will not return this in some cases, hence `code_name` being an
    /// `Option`.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,

    /// A document providing more information about the write error (e.g. details
    /// pertaining to document validation).
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}

/// An individual write error that occurred during a batched write operation.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct IndexedWriteError {
    /// Index into the list of models that this error corresponds to, counted from the
    /// start of the submitted sequence.
    #[serde(default)]
    pub index: usize,

    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    ///
    /// Note that the server will not return this in some cases, hence `code_name` being an
    /// `Option`.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,

    /// A document providing more information about the write error (e.g. details
    /// pertaining to document validation).
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}

/// An error that occurred when trying to execute a write operation.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum WriteFailure {
    /// An error that occurred due to not being able to satisfy a write concern.
    WriteConcernError(WriteConcernError),

    /// An error that occurred during a write operation that wasn't due to being unable to
    /// satisfy a write concern.
    WriteError(WriteError),
}

impl WriteFailure {
    fn from_bulk_error(bulk: &BulkWriteError) -> Option<Self> {
        if let Some(write_error) = bulk.write_errors.first() {
            Some(WriteFailure::WriteError(WriteError {
                code: write_error.code,
                code_name: write_error.code_name.clone(),
                message: write_error.message.clone(),
                details: write_error.details.clone(),
            }))
        } else {
            bulk.write_concern_error
                .clone()
                .map(WriteFailure::WriteConcernError)
        }
    }
}

/// Translates `ErrorKind::BulkWrite` cases produced by a one-model batch to
/// `ErrorKind::Write`, preserving the label set; all other errors pass through untouched.
/// A bulk error carrying only labels (no write errors and no write concern error) also
/// passes through so the labels are not dropped.
pub(crate) fn convert_bulk_errors(error: Error) -> Error {
    let converted = match error.kind.as_ref() {
        ErrorKind::BulkWrite(bulk_error) => WriteFailure::from_bulk_error(bulk_error),
        _ => None,
    };
    match converted {
        Some(failure) => Error::new(ErrorKind::Write(failure), Some(error.labels.clone())),
        None => error,
    }
}
