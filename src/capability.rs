//! Pre-dispatch validation of capability-gated command parameters against the server's
//! negotiated wire version.

use crate::{
    error::{ErrorKind, Result},
    options::WriteModel,
    transport::StreamDescription,
};

/// The minimum wire version required to use the `hint` command parameter on a write.
pub const HINT_MIN_WIRE_VERSION: i32 = 5;

/// The minimum wire version required to use the `arrayFilters` command parameter.
pub const ARRAY_FILTERS_MIN_WIRE_VERSION: i32 = 6;

/// A table mapping capability-gated command parameters to the minimum wire version a
/// server must speak to accept them. Adding a gated parameter means adding a table entry;
/// the checking logic is shared.
#[derive(Clone, Copy, Debug)]
pub struct CapabilityRequirements(&'static [(&'static str, i32)]);

/// The capability requirements for write command parameters.
pub const WRITE_OPTION_REQUIREMENTS: CapabilityRequirements = CapabilityRequirements(&[
    ("hint", HINT_MIN_WIRE_VERSION),
    ("arrayFilters", ARRAY_FILTERS_MIN_WIRE_VERSION),
]);

impl CapabilityRequirements {
    /// The minimum wire version required for the named parameter, if it is gated at all.
    pub fn minimum_wire_version(&self, option: &str) -> Option<i32> {
        self.0
            .iter()
            .find(|(name, _)| *name == option)
            .map(|(_, version)| *version)
    }

    /// Checks a single parameter against the negotiated stream description. A stream with
    /// no negotiated wire version is treated as version 0.
    pub fn check_option(&self, option: &str, description: &StreamDescription) -> Result<()> {
        let Some(minimum) = self.minimum_wire_version(option) else {
            return Ok(());
        };
        let negotiated = description.max_wire_version.unwrap_or(0);
        if negotiated >= minimum {
            return Ok(());
        }
        Err(ErrorKind::IncompatibleServer {
            message: format!(
                "the '{}' command parameter requires a minimum server wire version of {}",
                option, minimum
            ),
        }
        .into())
    }
}

/// Checks every gated parameter a model carries. Fails on the first unsupported one.
pub(crate) fn validate_model(model: &WriteModel, description: &StreamDescription) -> Result<()> {
    for option in model.constrained_options() {
        WRITE_OPTION_REQUIREMENTS.check_option(option, description)?;
    }
    Ok(())
}

/// Validates an entire model sequence before any dispatch. One unsupported parameter
/// fails the whole call.
pub(crate) fn validate_models(models: &[WriteModel], description: &StreamDescription) -> Result<()> {
    for model in models {
        validate_model(model, description)?;
    }
    Ok(())
}
