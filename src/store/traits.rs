use crate::error::StoreResult;
use crate::model::{
    AssignmentAck, AssignmentRequest, ClassroomRecord, EnrollmentRecord, FilterContext, GradeLevel,
    Id,
};

#[async_trait::async_trait]
pub trait GradeLevelStore: Send + Sync {
    /// Grade levels offered by a school
    async fn list_grade_levels(&self, school_id: &Id) -> StoreResult<Vec<GradeLevel>>;
}

#[async_trait::async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Enrollments in the context that have no classroom yet
    async fn list_unassigned(&self, context: &FilterContext) -> StoreResult<Vec<EnrollmentRecord>>;
}

#[async_trait::async_trait]
pub trait ClassroomStore: Send + Sync {
    /// Classrooms of the context's grade level, each with its occupants
    async fn list_classrooms(&self, context: &FilterContext) -> StoreResult<Vec<ClassroomRecord>>;
}

#[async_trait::async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Assign an enrollment to a classroom, or unassign it when the target is `None`
    async fn assign(&self, request: &AssignmentRequest) -> StoreResult<AssignmentAck>;
}

pub trait Store: GradeLevelStore + EnrollmentStore + ClassroomStore + AssignmentStore + Send + Sync {}
