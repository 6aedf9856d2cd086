//! Request and response shapes of the remote roster API.

use crate::model::{FilterContext, Id, PeriodMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeLevel {
    pub grade_level_id: Id,
    pub name: String,
}

/// Query string shared by the two roster fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterQuery {
    pub school_id: Id,
    pub grade_level_id: Id,
    pub period: String,
    #[serde(default)]
    pub period_kind: PeriodMode,
}

impl RosterQuery {
    pub fn context(&self) -> FilterContext {
        FilterContext {
            school_id: self.school_id.clone(),
            period: self.period_kind.period(self.period.clone()),
            grade_level_id: self.grade_level_id.clone(),
        }
    }
}

impl From<&FilterContext> for RosterQuery {
    fn from(context: &FilterContext) -> Self {
        Self {
            school_id: context.school_id.clone(),
            grade_level_id: context.grade_level_id.clone(),
            period: context.period.value().to_string(),
            period_kind: context.period.mode(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub enrollment_id: Id,
    pub student_id: Id,
    pub student_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomRecord {
    pub classroom_id: Id,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub occupant_enrollments: Vec<EnrollmentRecord>,
}

/// Assign (target set) or unassign (target null) one enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub enrollment_id: Id,
    pub target_classroom_id: Option<Id>,
    pub school_id: Id,
    pub period: String,
    #[serde(default)]
    pub period_kind: PeriodMode,
    pub grade_level_id: Id,
}

impl AssignmentRequest {
    pub fn new(enrollment_id: Id, target_classroom_id: Option<Id>, context: &FilterContext) -> Self {
        Self {
            enrollment_id,
            target_classroom_id,
            school_id: context.school_id.clone(),
            period: context.period.value().to_string(),
            period_kind: context.period.mode(),
            grade_level_id: context.grade_level_id.clone(),
        }
    }

    pub fn context(&self) -> FilterContext {
        FilterContext {
            school_id: self.school_id.clone(),
            period: self.period_kind.period(self.period.clone()),
            grade_level_id: self.grade_level_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentAck {
    pub enrollment_id: Id,
    pub classroom_id: Option<Id>,
    pub assignment_id: Id,
    pub assigned_at: chrono::DateTime<chrono::Utc>,
}

/// Error body returned by the roster API on any non-success status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}
