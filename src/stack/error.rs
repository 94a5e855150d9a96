use std::time::Duration;

use super::status::{StackStatus, UnknownStackStatus};

#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// The provider rejected the template. Fatal, no retry.
    #[error("Template validation failed: {0}")]
    TemplateValidation(String),

    /// Precondition violation: the stack is not in a ready status.
    #[error("Stack {name} provisioning is not complete - stack status: {status}")]
    NotReady { name: String, status: StackStatus },

    #[error("Stack {0} not found")]
    NotFound(String),

    /// The provider reported nothing to update. Special-cased into a
    /// successful no-op by the provisioner.
    #[error("No updates are to be performed on stack {0}")]
    NoUpdates(String),

    /// Only raised when a poll deadline is configured.
    #[error("Timed out after {waited:?} waiting for stack {name}")]
    PollTimeout { name: String, waited: Duration },

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStackStatus),

    /// Any other provider error, propagated unmodified.
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}
