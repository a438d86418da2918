//! Batched execution of write model sequences.

use crate::{
    capability,
    error::{BulkWriteError, Error, ErrorKind, Result},
    operation::{SummaryBody, WriteResponseBody},
    options::{BulkWriteOptions, WriteModel},
    results::BulkWriteResult,
    transport::WriteTransport,
};

/// A pending bulk write. Construct with [`WriteClient::bulk_write`](crate::WriteClient::bulk_write)
/// and dispatch with [`run`](BulkWrite::run).
#[must_use]
pub struct BulkWrite<'a, T: WriteTransport> {
    transport: &'a mut T,
    models: Vec<WriteModel>,
    options: Option<BulkWriteOptions>,
}

impl<'a, T: WriteTransport> BulkWrite<'a, T> {
    pub(crate) fn new(transport: &'a mut T, models: Vec<WriteModel>) -> Self {
        Self {
            transport,
            models,
            options: None,
        }
    }

    /// Whether the writes must execute in the order given and stop at the first write
    /// error. Defaults to true.
    pub fn ordered(mut self, ordered: bool) -> Self {
        self.options
            .get_or_insert_with(Default::default)
            .ordered = Some(ordered);
        self
    }

    /// Replaces all options with the given set.
    pub fn with_options(mut self, options: impl Into<Option<BulkWriteOptions>>) -> Self {
        self.options = options.into();
        self
    }

    fn is_ordered(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|options| options.ordered)
            .unwrap_or(true)
    }

    /// Executes the writes. Every model is validated against the server's capabilities
    /// before anything is dispatched; one unsupported option fails the whole call.
    pub fn run(self) -> Result<BulkWriteResult> {
        let ordered = self.is_ordered();
        let Self {
            transport, models, ..
        } = self;

        let description = transport.stream_description().clone();
        capability::validate_models(&models, &description)?;

        let max_batch_size = usize::try_from(description.max_write_batch_size)
            .unwrap_or(usize::MAX)
            .max(1);

        let mut execution_status = ExecutionStatus::None;
        let mut total_attempted = 0;
        while total_attempted < models.len() && execution_status.should_continue(ordered) {
            let batch_end = models.len().min(total_attempted + max_batch_size);
            let batch = &models[total_attempted..batch_end];
            tracing::debug!(
                batch_size = batch.len(),
                offset = total_attempted,
                ordered,
                "dispatching write batch"
            );
            let batch_result = execute_batch(transport, batch, ordered, total_attempted);
            total_attempted += batch.len();
            execution_status = match batch_result {
                Ok(result) => execution_status.with_success(result),
                Err(error) => execution_status.with_failure(error),
            };
        }
        if total_attempted < models.len() {
            tracing::debug!(
                remaining = models.len() - total_attempted,
                "stopping bulk write early"
            );
        }

        match execution_status {
            ExecutionStatus::Success(result) => Ok(result),
            ExecutionStatus::Error(error) => Err(error),
            ExecutionStatus::None => Err(Error::invalid_argument(
                "bulk_write must be provided at least one write operation",
            )),
        }
    }
}

/// Sends one batch and classifies its reply. Write-error indices in the reply are local
/// to the batch and get offset to refer back to the original model sequence; counts for
/// the writes that did succeed ride along as the error's partial result.
fn execute_batch<T: WriteTransport>(
    transport: &mut T,
    batch: &[WriteModel],
    ordered: bool,
    offset: usize,
) -> Result<BulkWriteResult> {
    let reply = transport.execute_batch(batch, ordered)?;
    let response = WriteResponseBody::<SummaryBody>::from_reply(reply)?;
    let result = response.to_result();
    match response.validate() {
        Ok(()) => Ok(result),
        Err(mut error) => {
            if let ErrorKind::BulkWrite(ref mut failure) = *error.kind {
                for write_error in failure.write_errors.iter_mut() {
                    write_error.index += offset;
                }
                if !result.is_empty() {
                    failure.merge_partial_results(result);
                }
            }
            Err(error)
        }
    }
}

/// Tracks the state of a bulk write as batches complete.
enum ExecutionStatus {
    /// Every batch so far succeeded.
    Success(BulkWriteResult),
    /// At least one batch failed.
    Error(Error),
    /// No batches have been attempted.
    None,
}

impl ExecutionStatus {
    fn with_success(self, result: BulkWriteResult) -> Self {
        match self {
            Self::Success(mut current) => {
                current.merge(result);
                Self::Success(current)
            }
            Self::Error(mut error) => {
                if let ErrorKind::BulkWrite(ref mut failure) = *error.kind {
                    failure.merge_partial_results(result);
                }
                Self::Error(error)
            }
            Self::None => Self::Success(result),
        }
    }

    fn with_failure(self, mut error: Error) -> Self {
        match self {
            Self::Success(partial_result) => match *error.kind {
                ErrorKind::BulkWrite(ref mut failure) => {
                    failure.merge_partial_results(partial_result);
                    Self::Error(error)
                }
                // The request produced no classifiable reply. Keep the counts
                // accumulated so far and carry the cause as the source.
                _ => {
                    let failure = BulkWriteError {
                        partial_result: Some(partial_result),
                        ..Default::default()
                    };
                    let wrapped = Error::new(ErrorKind::BulkWrite(failure), None::<Vec<String>>)
                        .with_source(error);
                    Self::Error(wrapped)
                }
            },
            Self::Error(mut previous) => {
                let Error {
                    kind,
                    labels,
                    source,
                } = error;
                match (previous.kind.as_mut(), *kind) {
                    (ErrorKind::BulkWrite(previous_failure), ErrorKind::BulkWrite(failure)) => {
                        previous_failure.merge(failure);
                        previous.labels = previous.labels.union(&labels);
                        if previous.source.is_none() {
                            previous.source = source;
                        }
                        Self::Error(previous)
                    }
                    (_, kind) => {
                        previous.source = Some(Box::new(Error {
                            kind: Box::new(kind),
                            labels,
                            source,
                        }));
                        Self::Error(previous)
                    }
                }
            }
            Self::None => Self::Error(error),
        }
    }

    /// Whether further batches should be dispatched given the current state.
    fn should_continue(&self, ordered: bool) -> bool {
        match self {
            Self::Error(error) => match *error.kind {
                ErrorKind::BulkWrite(ref failure) => {
                    // An error with no classifiable reply is always fatal; a write
                    // error is fatal only in ordered mode.
                    let top_level_error_occurred = error.source.is_some();
                    let terminal_write_error_occurred =
                        ordered && !failure.write_errors.is_empty();
                    !top_level_error_occurred && !terminal_write_error_occurred
                }
                _ => false,
            },
            _ => true,
        }
    }
}
