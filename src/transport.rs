use crate::{bson::Document, error::Result, options::WriteModel};

/// Contains the negotiated properties of the stream a transport writes to.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct StreamDescription {
    /// The maximum wire version the server speaks, if one has been negotiated.
    pub max_wire_version: Option<i32>,

    /// The maximum number of write operations the server accepts in a single batch.
    pub max_write_batch_size: i64,
}

impl Default for StreamDescription {
    fn default() -> Self {
        Self {
            max_wire_version: None,
            max_write_batch_size: 100_000,
        }
    }
}

impl StreamDescription {
    /// A description with the given wire version and default batch size.
    pub fn with_wire_version(max_wire_version: i32) -> Self {
        Self {
            max_wire_version: Some(max_wire_version),
            ..Default::default()
        }
    }

    /// A description matching a recent server, for testing.
    #[cfg(test)]
    pub(crate) fn new_testing() -> Self {
        Self::with_wire_version(8)
    }
}

/// The seam between this crate and the network layer. Implementations send a batch of
/// write models as a single command and hand back the raw reply document; blocking and
/// cancellation live behind this trait.
pub trait WriteTransport {
    /// The negotiated properties of the underlying stream.
    fn stream_description(&self) -> &StreamDescription;

    /// Executes the given models as one command and returns the server's raw reply. An
    /// `Err` here means the request produced no classifiable reply at all.
    fn execute_batch(&mut self, models: &[WriteModel], ordered: bool) -> Result<Document>;
}
