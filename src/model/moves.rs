use crate::model::{FilterContext, Id, Partition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A request to relocate one enrollment, as emitted by a drag gesture or a "move to…" menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub enrollment_id: Id,
    pub from: Partition,
    pub to: Partition,
}

impl MoveIntent {
    pub fn new(enrollment_id: impl Into<Id>, from: Partition, to: Partition) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            from,
            to,
        }
    }

    pub fn assign(enrollment_id: impl Into<Id>, classroom_id: impl Into<Id>) -> Self {
        Self::new(
            enrollment_id,
            Partition::Unassigned,
            Partition::Classroom(classroom_id.into()),
        )
    }
}

/// Per-enrollment mutation state as seen between calls.
///
/// Applying the local move and settling a confirmed one both complete
/// inside a single engine call, so neither is ever observable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveState {
    #[default]
    Idle,
    Confirming,
    RollingBack,
}

/// An in-flight mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMove {
    pub ticket: u64,
    pub enrollment_id: Id,
    pub from_partition: Partition,
    pub to_partition: Partition,
    pub context: FilterContext,
    pub state: MoveState,
    pub dispatched_at: DateTime<Utc>,
}

/// Why a move intent was refused before anything was applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Roster is not loaded")]
    RosterNotReady,

    #[error("Enrollment '{enrollment_id}' is not in the current roster")]
    UnknownEnrollment { enrollment_id: Id },

    #[error("Enrollment '{enrollment_id}' is in {actual}, not {claimed}")]
    StaleSource {
        enrollment_id: Id,
        claimed: Partition,
        actual: Partition,
    },

    #[error("Enrollment is already in {0}")]
    SameDestination(Partition),

    #[error("Classroom '{classroom_id}' is not in the current roster")]
    UnknownDestination { classroom_id: Id },

    #[error("Classroom '{display_name}' is full ({capacity}/{capacity})")]
    CapacityExceeded {
        classroom_id: Id,
        display_name: String,
        capacity: u32,
    },

    #[error("A move for enrollment '{enrollment_id}' is still being confirmed")]
    AlreadyPending { enrollment_id: Id },
}

impl Rejection {
    /// The message shown to the user; `None` for a silent no-op
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Rejection::SameDestination(_) => None,
            Rejection::CapacityExceeded {
                display_name,
                capacity,
                ..
            } => Some(Notice::ClassroomFull {
                classroom_name: display_name.clone(),
                capacity: *capacity,
            }),
            Rejection::AlreadyPending { .. } => Some(Notice::MoveInProgress),
            Rejection::RosterNotReady => Some(Notice::RosterNotReady),
            Rejection::UnknownEnrollment { .. }
            | Rejection::StaleSource { .. }
            | Rejection::UnknownDestination { .. } => Some(Notice::RosterOutOfDate),
        }
    }
}

/// User-facing copy produced by the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    ClassroomFull { classroom_name: String, capacity: u32 },
    MoveInProgress,
    RosterNotReady,
    RosterOutOfDate,
    AssignmentFailed { message: String },
}

pub const GENERIC_ASSIGNMENT_FAILURE: &str =
    "The assignment could not be saved. The roster has been reloaded.";

impl Notice {
    /// Failure notice carrying the server's message verbatim when there is one
    pub fn assignment_failed(server_message: Option<&str>) -> Self {
        Notice::AssignmentFailed {
            message: server_message
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_ASSIGNMENT_FAILURE.to_string()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ClassroomFull {
                classroom_name,
                capacity,
            } => write!(
                f,
                "{} is full ({} students). Choose another classroom.",
                classroom_name, capacity
            ),
            Notice::MoveInProgress => {
                f.write_str("This student is still being moved. Try again in a moment.")
            }
            Notice::RosterNotReady => f.write_str("The roster is still loading."),
            Notice::RosterOutOfDate => {
                f.write_str("The roster changed. Refresh and try the move again.")
            }
            Notice::AssignmentFailed { message } => f.write_str(message),
        }
    }
}

/// How a confirmed move ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The server accepted the move; local state already matches
    Settled,
    /// The server refused or timed out; the roster was reloaded
    RolledBack { notice: Notice },
    /// The move's context or ticket was superseded before completion
    Discarded,
}

/// Result of a fetch that may complete after its context was superseded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Applied(T),
    Superseded,
}

impl<T> FetchOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_state_names() {
        assert_eq!(serde_json::to_string(&MoveState::RollingBack).unwrap(), "\"rolling_back\"");
        assert_eq!(
            serde_json::from_str::<MoveState>("\"confirming\"").unwrap(),
            MoveState::Confirming
        );
        assert!(serde_json::from_str::<MoveState>("\"applying\"").is_err());
        assert!(serde_json::from_str::<MoveState>("\"settled\"").is_err());
        assert_eq!(MoveState::default(), MoveState::Idle);
    }

    #[test]
    fn test_same_destination_is_silent() {
        let rejection = Rejection::SameDestination(Partition::Unassigned);
        assert_eq!(rejection.notice(), None);
    }

    #[test]
    fn test_capacity_rejection_reads_as_full_classroom() {
        let rejection = Rejection::CapacityExceeded {
            classroom_id: "7A".to_string(),
            display_name: "7A".to_string(),
            capacity: 2,
        };
        let notice = rejection.notice().unwrap();
        assert_eq!(notice.to_string(), "7A is full (2 students). Choose another classroom.");
    }

    #[test]
    fn test_assignment_failure_prefers_server_message() {
        assert_eq!(
            Notice::assignment_failed(Some("Classroom 7A was filled by another user"))
                .to_string(),
            "Classroom 7A was filled by another user"
        );
        assert_eq!(
            Notice::assignment_failed(None).to_string(),
            GENERIC_ASSIGNMENT_FAILURE
        );
    }
}
