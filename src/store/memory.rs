use crate::error::{StoreError, StoreResult};
use crate::model::{
    compare_display_names, generate_id, AssignmentAck, AssignmentRequest, ClassroomRecord,
    EnrollmentRecord, FilterContext, GradeLevel, Id, Period,
};
use crate::store::traits::{AssignmentStore, ClassroomStore, EnrollmentStore, GradeLevelStore, Store};
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub year_id: Id,
    pub name: String,
}

impl AcademicYear {
    pub fn new(year_id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            year_id: year_id.into(),
            name: name.into(),
        }
    }

    fn matches(&self, period: &Period) -> bool {
        match period {
            Period::AcademicYearId(id) => &self.year_id == id,
            Period::AcademicYearName(name) => &self.name == name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub school_id: Id,
    pub name: String,
    pub grade_levels: Vec<GradeLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomEntry {
    pub classroom_id: Id,
    pub school_id: Id,
    pub grade_level_id: Id,
    pub academic_year: AcademicYear,
    pub name: String,
    pub capacity: u32,
}

impl ClassroomEntry {
    fn in_context(&self, context: &FilterContext) -> bool {
        self.school_id == context.school_id
            && self.grade_level_id == context.grade_level_id
            && self.academic_year.matches(&context.period)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentEntry {
    pub enrollment_id: Id,
    pub student_id: Id,
    pub student_name: String,
    pub school_id: Id,
    pub grade_level_id: Id,
    pub academic_year: AcademicYear,
    pub classroom_id: Option<Id>,
}

impl EnrollmentEntry {
    fn in_context(&self, context: &FilterContext) -> bool {
        self.school_id == context.school_id
            && self.grade_level_id == context.grade_level_id
            && self.academic_year.matches(&context.period)
    }

    fn record(&self) -> EnrollmentRecord {
        EnrollmentRecord {
            enrollment_id: self.enrollment_id.clone(),
            student_id: self.student_id.clone(),
            student_name: self.student_name.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    schools: HashMap<Id, School>,
    classrooms: HashMap<Id, ClassroomEntry>,
    enrollments: HashMap<Id, EnrollmentEntry>,
}

impl MemoryState {
    fn occupancy(&self, classroom_id: &str) -> usize {
        self.enrollments
            .values()
            .filter(|e| e.classroom_id.as_deref() == Some(classroom_id))
            .count()
    }
}

/// In-memory roster backend.
///
/// Enforces classroom capacity on assignment, so a target filled by another
/// writer yields a conflict exactly as the real API does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_school(&self, school: School) {
        self.state.write().schools.insert(school.school_id.clone(), school);
    }

    pub fn upsert_classroom(&self, classroom: ClassroomEntry) {
        self.state
            .write()
            .classrooms
            .insert(classroom.classroom_id.clone(), classroom);
    }

    pub fn upsert_enrollment(&self, enrollment: EnrollmentEntry) {
        self.state
            .write()
            .enrollments
            .insert(enrollment.enrollment_id.clone(), enrollment);
    }

    /// Current classroom of an enrollment; `None` if the enrollment is unknown
    pub fn classroom_of(&self, enrollment_id: &str) -> Option<Option<Id>> {
        self.state
            .read()
            .enrollments
            .get(enrollment_id)
            .map(|e| e.classroom_id.clone())
    }

    pub fn occupancy(&self, classroom_id: &str) -> usize {
        self.state.read().occupancy(classroom_id)
    }

    pub fn enrollment_count(&self) -> usize {
        self.state.read().enrollments.len()
    }

    pub fn list_schools(&self) -> Vec<School> {
        let mut schools: Vec<School> = self.state.read().schools.values().cloned().collect();
        schools.sort_by(|a, b| a.school_id.cmp(&b.school_id));
        schools
    }
}

#[async_trait::async_trait]
impl GradeLevelStore for MemoryStore {
    async fn list_grade_levels(&self, school_id: &Id) -> StoreResult<Vec<GradeLevel>> {
        let state = self.state.read();
        let school = state
            .schools
            .get(school_id)
            .ok_or_else(|| StoreError::NotFound(format!("School '{}' not found", school_id)))?;
        Ok(school.grade_levels.clone())
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for MemoryStore {
    async fn list_unassigned(&self, context: &FilterContext) -> StoreResult<Vec<EnrollmentRecord>> {
        let state = self.state.read();
        let mut unassigned: Vec<EnrollmentRecord> = state
            .enrollments
            .values()
            .filter(|e| e.classroom_id.is_none() && e.in_context(context))
            .map(EnrollmentEntry::record)
            .collect();

        unassigned.sort_by(|a, b| {
            compare_display_names(&a.student_name, &a.enrollment_id, &b.student_name, &b.enrollment_id)
        });
        Ok(unassigned)
    }
}

#[async_trait::async_trait]
impl ClassroomStore for MemoryStore {
    async fn list_classrooms(&self, context: &FilterContext) -> StoreResult<Vec<ClassroomRecord>> {
        let state = self.state.read();
        let mut classrooms: Vec<ClassroomRecord> = state
            .classrooms
            .values()
            .filter(|c| c.in_context(context))
            .map(|classroom| ClassroomRecord {
                classroom_id: classroom.classroom_id.clone(),
                name: classroom.name.clone(),
                capacity: classroom.capacity,
                occupant_enrollments: state
                    .enrollments
                    .values()
                    .filter(|e| e.classroom_id.as_deref() == Some(classroom.classroom_id.as_str()))
                    .map(EnrollmentEntry::record)
                    .collect(),
            })
            .collect();

        classrooms.sort_by(|a, b| a.classroom_id.cmp(&b.classroom_id));
        Ok(classrooms)
    }
}

#[async_trait::async_trait]
impl AssignmentStore for MemoryStore {
    async fn assign(&self, request: &AssignmentRequest) -> StoreResult<AssignmentAck> {
        let context = request.context();
        let mut state = self.state.write();

        let enrollment = state.enrollments.get(&request.enrollment_id).ok_or_else(|| {
            StoreError::NotFound(format!("Enrollment '{}' not found", request.enrollment_id))
        })?;
        if !enrollment.in_context(&context) {
            return Err(StoreError::Invalid(format!(
                "Enrollment '{}' does not belong to {}",
                request.enrollment_id, context
            )));
        }
        let current = enrollment.classroom_id.clone();

        if let Some(target) = &request.target_classroom_id {
            let classroom = state.classrooms.get(target).ok_or_else(|| {
                StoreError::NotFound(format!("Classroom '{}' not found", target))
            })?;
            if !classroom.in_context(&context) {
                return Err(StoreError::Invalid(format!(
                    "Classroom '{}' does not belong to {}",
                    target, context
                )));
            }

            if current.as_ref() != Some(target) && state.occupancy(target) >= classroom.capacity as usize {
                return Err(StoreError::conflict(format!(
                    "Classroom {} is full ({} of {} seats taken)",
                    classroom.name, classroom.capacity, classroom.capacity
                )));
            }
        }

        if current == request.target_classroom_id {
            debug!(
                "Enrollment '{}' already in {:?}; nothing to change",
                request.enrollment_id, current
            );
        } else if let Some(enrollment) = state.enrollments.get_mut(&request.enrollment_id) {
            enrollment.classroom_id = request.target_classroom_id.clone();
            info!(
                "Enrollment '{}' moved from {:?} to {:?}",
                request.enrollment_id, current, request.target_classroom_id
            );
        }

        Ok(AssignmentAck {
            enrollment_id: request.enrollment_id.clone(),
            classroom_id: request.target_classroom_id.clone(),
            assignment_id: generate_id(),
            assigned_at: chrono::Utc::now(),
        })
    }
}

impl Store for MemoryStore {}
