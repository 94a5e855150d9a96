use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed CloudFormation stack status vocabulary. Statuses outside this
/// set fail to parse; extending the vocabulary is a source change here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    RollbackInProgress,
    RollbackComplete,
    RollbackFailed,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
    UpdateInProgress,
    UpdateComplete,
    UpdateCompleteCleanupInProgress,
    UpdateRollbackInProgress,
    UpdateRollbackComplete,
    UpdateRollbackFailed,
    UpdateRollbackCompleteCleanupInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    InProgress,
    Success,
    Failure,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unrecognized stack status: {0}")]
pub struct UnknownStackStatus(pub String);

impl StackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackStatus::CreateInProgress => "CREATE_IN_PROGRESS",
            StackStatus::CreateComplete => "CREATE_COMPLETE",
            StackStatus::CreateFailed => "CREATE_FAILED",
            StackStatus::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            StackStatus::RollbackComplete => "ROLLBACK_COMPLETE",
            StackStatus::RollbackFailed => "ROLLBACK_FAILED",
            StackStatus::DeleteInProgress => "DELETE_IN_PROGRESS",
            StackStatus::DeleteComplete => "DELETE_COMPLETE",
            StackStatus::DeleteFailed => "DELETE_FAILED",
            StackStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
            StackStatus::UpdateComplete => "UPDATE_COMPLETE",
            StackStatus::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            StackStatus::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            StackStatus::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            StackStatus::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            StackStatus::UpdateRollbackCompleteCleanupInProgress => {
                "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"
            }
        }
    }

    /// Classification table for the polling state machine. The two
    /// *_CLEANUP_IN_PROGRESS statuses are terminal: the stack is already
    /// usable while CloudFormation removes leftover resources.
    pub fn class(&self) -> StatusClass {
        match self {
            StackStatus::CreateInProgress
            | StackStatus::RollbackInProgress
            | StackStatus::DeleteInProgress
            | StackStatus::UpdateInProgress
            | StackStatus::UpdateRollbackInProgress => StatusClass::InProgress,

            StackStatus::CreateComplete
            | StackStatus::UpdateComplete
            | StackStatus::UpdateCompleteCleanupInProgress
            | StackStatus::DeleteComplete => StatusClass::Success,

            StackStatus::CreateFailed
            | StackStatus::RollbackComplete
            | StackStatus::RollbackFailed
            | StackStatus::DeleteFailed
            | StackStatus::UpdateRollbackComplete
            | StackStatus::UpdateRollbackFailed
            | StackStatus::UpdateRollbackCompleteCleanupInProgress => StatusClass::Failure,
        }
    }

    /// Safe to start a new update or delete.
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            StackStatus::CreateComplete
                | StackStatus::UpdateComplete
                | StackStatus::UpdateRollbackComplete
                | StackStatus::UpdateCompleteCleanupInProgress
        )
    }

    pub fn is_in_progress(&self) -> bool {
        self.class() == StatusClass::InProgress
    }

    /// Terminal statuses that count as a successful create or update.
    pub fn is_provision_success(&self) -> bool {
        matches!(
            self,
            StackStatus::CreateComplete
                | StackStatus::UpdateComplete
                | StackStatus::UpdateCompleteCleanupInProgress
        )
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StackStatus {
    type Err = UnknownStackStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE_IN_PROGRESS" => Ok(StackStatus::CreateInProgress),
            "CREATE_COMPLETE" => Ok(StackStatus::CreateComplete),
            "CREATE_FAILED" => Ok(StackStatus::CreateFailed),
            "ROLLBACK_IN_PROGRESS" => Ok(StackStatus::RollbackInProgress),
            "ROLLBACK_COMPLETE" => Ok(StackStatus::RollbackComplete),
            "ROLLBACK_FAILED" => Ok(StackStatus::RollbackFailed),
            "DELETE_IN_PROGRESS" => Ok(StackStatus::DeleteInProgress),
            "DELETE_COMPLETE" => Ok(StackStatus::DeleteComplete),
            "DELETE_FAILED" => Ok(StackStatus::DeleteFailed),
            "UPDATE_IN_PROGRESS" => Ok(StackStatus::UpdateInProgress),
            "UPDATE_COMPLETE" => Ok(StackStatus::UpdateComplete),
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => {
                Ok(StackStatus::UpdateCompleteCleanupInProgress)
            }
            "UPDATE_ROLLBACK_IN_PROGRESS" => Ok(StackStatus::UpdateRollbackInProgress),
            "UPDATE_ROLLBACK_COMPLETE" => Ok(StackStatus::UpdateRollbackComplete),
            "UPDATE_ROLLBACK_FAILED" => Ok(StackStatus::UpdateRollbackFailed),
            "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => {
                Ok(StackStatus::UpdateRollbackCompleteCleanupInProgress)
            }
            other => Err(UnknownStackStatus(other.to_string())),
        }
    }
}

pub const ALL_STATUSES: [StackStatus; 16] = [
    StackStatus::CreateInProgress,
    StackStatus::CreateComplete,
    StackStatus::CreateFailed,
    StackStatus::RollbackInProgress,
    StackStatus::RollbackComplete,
    StackStatus::RollbackFailed,
    StackStatus::DeleteInProgress,
    StackStatus::DeleteComplete,
    StackStatus::DeleteFailed,
    StackStatus::UpdateInProgress,
    StackStatus::UpdateComplete,
    StackStatus::UpdateCompleteCleanupInProgress,
    StackStatus::UpdateRollbackInProgress,
    StackStatus::UpdateRollbackComplete,
    StackStatus::UpdateRollbackFailed,
    StackStatus::UpdateRollbackCompleteCleanupInProgress,
];
