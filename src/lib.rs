//! The client-side write path of a MongoDB-style driver: reply classification, write and
//! bulk write error aggregation, and pre-dispatch capability validation.
//!
//! The crate sits between application code and a caller-supplied [`WriteTransport`]. It
//! turns raw BSON reply documents into typed results or [`Error`]s, batches bulk writes
//! against the transport's negotiated limits, and rejects capability-gated command
//! parameters (such as `hint`) before anything reaches a server that cannot honor them.
//!
//! ```no_run
//! # use mongodb_write_core::{Result, WriteClient, WriteTransport};
//! # use mongodb_write_core::bson::doc;
//! # use mongodb_write_core::options::WriteModel;
//! # fn demo(transport: impl WriteTransport) -> Result<()> {
//! let mut client = WriteClient::new(transport);
//! client.update_one(doc! { "x": 1 }, doc! { "$set": { "x": 2 } }, None)?;
//! let models = vec![WriteModel::InsertOne { document: doc! { "x": 3 } }];
//! let _result = client.bulk_write(models).ordered(false).run()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use bson;

pub mod error;
pub mod options;
pub mod results;

mod bson_util;
mod bulk_write;
mod capability;
mod client;
mod operation;
mod transport;

#[cfg(test)]
mod test;

pub use crate::{
    bulk_write::BulkWrite,
    capability::{
        CapabilityRequirements,
        ARRAY_FILTERS_MIN_WIRE_VERSION,
        HINT_MIN_WIRE_VERSION,
        WRITE_OPTION_REQUIREMENTS,
    },
    client::WriteClient,
    error::{Error, ErrorKind, ErrorLabels, Result},
    transport::{StreamDescription, WriteTransport},
};
