//! Write models and per-operation options.

use serde::{Deserialize, Serialize};

use crate::bson::Document;

/// Specifies the index to use for an operation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum Hint {
    /// Specifies the keys of the index to use.
    Keys(Document),
    /// Specifies the name of the index to use.
    Name(String),
}

/// A single write to be performed, either on its own or as part of a bulk sequence.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum WriteModel {
    /// Insert a single document.
    InsertOne {
        /// The document to insert.
        document: Document,
    },
    /// Update up to one matching document.
    UpdateOne {
        /// The filter to use.
        filter: Document,
        /// The update to perform.
        update: Document,
        /// Whether a document should be inserted if no matching document is found.
        upsert: Option<bool>,
        /// A set of filters specifying to which array elements an update should apply.
        array_filters: Option<Vec<Document>>,
        /// The index to use for the operation.
        hint: Option<Hint>,
    },
    /// Update all matching documents.
    UpdateMany {
        /// The filter to use.
        filter: Document,
        /// The update to perform.
        update: Document,
        /// Whether a document should be inserted if no matching document is found.
        upsert: Option<bool>,
        /// A set of filters specifying to which array elements an update should apply.
        array_filters: Option<Vec<Document>>,
        /// The index to use for the operation.
        hint: Option<Hint>,
    },
    /// Replace up to one matching document.
    ReplaceOne {
        /// The filter to use.
        filter: Document,
        /// The replacement document.
        replacement: Document,
        /// Whether a document should be inserted if no matching document is found.
        upsert: Option<bool>,
        /// The index to use for the operation.
        hint: Option<Hint>,
    },
    /// Delete up to one matching document.
    DeleteOne {
        /// The filter to use.
        filter: Document,
        /// The index to use for the operation.
        hint: Option<Hint>,
    },
    /// Delete all matching documents.
    DeleteMany {
        /// The filter to use.
        filter: Document,
        /// The index to use for the operation.
        hint: Option<Hint>,
    },
}

impl WriteModel {
    /// The hint carried by this model, if any.
    pub fn hint(&self) -> Option<&Hint> {
        match self {
            Self::InsertOne { .. } => None,
            Self::UpdateOne { hint, .. }
            | Self::UpdateMany { hint, .. }
            | Self::ReplaceOne { hint, .. }
            | Self::DeleteOne { hint, .. }
            | Self::DeleteMany { hint, .. } => hint.as_ref(),
        }
    }

    /// The array filters carried by this model, if any.
    pub fn array_filters(&self) -> Option<&Vec<Document>> {
        match self {
            Self::UpdateOne { array_filters, .. } | Self::UpdateMany { array_filters, .. } => {
                array_filters.as_ref()
            }
            _ => None,
        }
    }

    /// The names of the capability-gated command parameters this model carries. Consumed
    /// by the capability validator before dispatch.
    pub(crate) fn constrained_options(&self) -> Vec<&'static str> {
        let mut options = Vec::new();
        if self.hint().is_some() {
            options.push("hint");
        }
        if self.array_filters().is_some() {
            options.push("arrayFilters");
        }
        options
    }
}

/// Options for an update operation.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct UpdateOptions {
    /// Whether a document should be inserted if no matching document is found.
    pub upsert: Option<bool>,

    /// A set of filters specifying to which array elements an update should apply.
    pub array_filters: Option<Vec<Document>>,

    /// The index to use for the operation.
    pub hint: Option<Hint>,
}

/// Options for a replace operation.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ReplaceOptions {
    /// Whether a document should be inserted if no matching document is found.
    pub upsert: Option<bool>,

    /// The index to use for the operation.
    pub hint: Option<Hint>,
}

/// Options for a delete operation.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct DeleteOptions {
    /// The index to use for the operation.
    pub hint: Option<Hint>,
}

/// Options for a bulk write operation.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct BulkWriteOptions {
    /// Whether the writes must execute in the order given and stop at the first failure.
    /// Defaults to true.
    pub ordered: Option<bool>,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Hint, WriteModel};
    use crate::bson::doc;

    #[test]
    fn constrained_options_reflect_model_fields() {
        let plain = WriteModel::DeleteOne {
            filter: doc! {},
            hint: None,
        };
        assert!(plain.constrained_options().is_empty());

        let hinted = WriteModel::DeleteOne {
            filter: doc! {},
            hint: Some(Hint::Name("_id_".to_string())),
        };
        assert_eq!(hinted.constrained_options(), vec!["hint"]);

        let both = WriteModel::UpdateOne {
            filter: doc! {},
            update: doc! { "$set": { "x": 1 } },
            upsert: None,
            array_filters: Some(vec![doc! { "elem.flag": true }]),
            hint: Some(Hint::Keys(doc! { "x": 1 })),
        };
        assert_eq!(both.constrained_options(), vec!["hint", "arrayFilters"]);
    }
}
