//! Fixtures and a scriptable store for engine tests.

use crate::error::{StoreError, StoreResult};
use crate::model::{
    AssignmentAck, AssignmentRequest, ClassroomRecord, EnrollmentRecord, FilterContext, GradeLevel,
    Id, PeriodMode,
};
use crate::store::memory::{AcademicYear, ClassroomEntry, EnrollmentEntry, MemoryStore, School};
use crate::store::traits::{AssignmentStore, ClassroomStore, EnrollmentStore, GradeLevelStore, Store};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub(crate) fn year() -> AcademicYear {
    AcademicYear::new("2024", "2024/2025")
}

/// school=1, period="2024/2025" (by name), grade=5
pub(crate) fn fixture_context() -> FilterContext {
    FilterContext::new("1", PeriodMode::AcademicYearName.period("2024/2025"), "5")
}

/// school=2, same period and grade
pub(crate) fn second_school_context() -> FilterContext {
    FilterContext::new("2", PeriodMode::AcademicYearName.period("2024/2025"), "5")
}

pub(crate) fn classroom(school: &str, grade: &str, id: &str, capacity: u32) -> ClassroomEntry {
    ClassroomEntry {
        classroom_id: id.to_string(),
        school_id: school.to_string(),
        grade_level_id: grade.to_string(),
        academic_year: year(),
        name: id.to_string(),
        capacity,
    }
}

pub(crate) fn enrollment(
    school: &str,
    grade: &str,
    id: &str,
    name: &str,
    classroom_id: Option<&str>,
) -> EnrollmentEntry {
    EnrollmentEntry {
        enrollment_id: id.to_string(),
        student_id: format!("s-{}", id.trim_start_matches("e-")),
        student_name: name.to_string(),
        school_id: school.to_string(),
        grade_level_id: grade.to_string(),
        academic_year: year(),
        classroom_id: classroom_id.map(str::to_string),
    }
}

/// Two schools. School 1 grade 5 has "7A" (capacity 2, full), "7B"
/// (capacity 30, 10 occupants) and three unassigned students.
pub(crate) fn fixture_store() -> MemoryStore {
    let store = MemoryStore::new();

    store.upsert_school(School {
        school_id: "1".to_string(),
        name: "Northside Secondary".to_string(),
        grade_levels: vec![
            GradeLevel {
                grade_level_id: "5".to_string(),
                name: "Grade 5".to_string(),
            },
            GradeLevel {
                grade_level_id: "6".to_string(),
                name: "Grade 6".to_string(),
            },
        ],
    });
    store.upsert_school(School {
        school_id: "2".to_string(),
        name: "Riverside Academy".to_string(),
        grade_levels: vec![GradeLevel {
            grade_level_id: "5".to_string(),
            name: "Grade 5".to_string(),
        }],
    });

    store.upsert_classroom(classroom("1", "5", "7A", 2));
    store.upsert_classroom(classroom("1", "5", "7B", 30));
    store.upsert_classroom(classroom("1", "6", "6A", 25));
    store.upsert_classroom(classroom("2", "5", "5X", 25));

    store.upsert_enrollment(enrollment("1", "5", "e-grace", "Grace Hopper", None));
    store.upsert_enrollment(enrollment("1", "5", "e-ada", "Ada Byron", None));
    store.upsert_enrollment(enrollment("1", "5", "e-emile", "Émile Zola", None));
    store.upsert_enrollment(enrollment("1", "5", "e-alan", "Alan Turing", Some("7A")));
    store.upsert_enrollment(enrollment("1", "5", "e-edsger", "Edsger Dijkstra", Some("7A")));
    for n in 0..10 {
        let id = format!("e-b{:02}", n);
        let name = format!("Student B{:02}", n);
        store.upsert_enrollment(enrollment("1", "5", &id, &name, Some("7B")));
    }
    store.upsert_enrollment(enrollment("1", "6", "e-ken", "Ken Thompson", None));
    store.upsert_enrollment(enrollment("2", "5", "e-barbara", "Barbara Liskov", None));
    store.upsert_enrollment(enrollment("2", "5", "e-donald", "Donald Knuth", Some("5X")));

    store
}

/// Wraps a `MemoryStore` with gates, scripted failures and call counters.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub inner: MemoryStore,
    load_gates: Mutex<HashMap<Id, Arc<Semaphore>>>,
    grade_gates: Mutex<HashMap<Id, Arc<Semaphore>>>,
    assign_gate: Mutex<Option<Arc<Semaphore>>>,
    assign_delay: Mutex<Option<Duration>>,
    assign_failures: Mutex<VecDeque<StoreError>>,
    load_failures: Mutex<VecDeque<StoreError>>,
    assign_calls: AtomicUsize,
    load_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fixture() -> Arc<Self> {
        Arc::new(Self::new(fixture_store()))
    }

    /// Roster loads for this school wait until `release_loads_for` is called
    pub fn hold_loads_for(&self, school_id: &str) {
        self.load_gates
            .lock()
            .insert(school_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_loads_for(&self, school_id: &str) {
        if let Some(gate) = self.load_gates.lock().get(school_id) {
            gate.add_permits(1);
        }
    }

    pub fn hold_grade_levels_for(&self, school_id: &str) {
        self.grade_gates
            .lock()
            .insert(school_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_grade_levels_for(&self, school_id: &str) {
        if let Some(gate) = self.grade_gates.lock().get(school_id) {
            gate.add_permits(1);
        }
    }

    pub fn hold_assignments(&self) {
        *self.assign_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_assignments(&self) {
        if let Some(gate) = self.assign_gate.lock().as_ref() {
            gate.add_permits(1);
        }
    }

    pub fn delay_assignments(&self, delay: Duration) {
        *self.assign_delay.lock() = Some(delay);
    }

    pub fn fail_next_assignment(&self, error: StoreError) {
        self.assign_failures.lock().push_back(error);
    }

    pub fn fail_next_load(&self, error: StoreError) {
        self.load_failures.lock().push_back(error);
    }

    pub fn assign_calls(&self) -> usize {
        self.assign_calls.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }
}

async fn pass(gate: Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        // The permit goes back on drop, so one release opens the gate for good
        let _permit = gate.acquire().await;
    }
}

#[async_trait::async_trait]
impl GradeLevelStore for ScriptedStore {
    async fn list_grade_levels(&self, school_id: &Id) -> StoreResult<Vec<GradeLevel>> {
        let gate = self.grade_gates.lock().get(school_id).cloned();
        pass(gate).await;
        self.inner.list_grade_levels(school_id).await
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for ScriptedStore {
    async fn list_unassigned(&self, context: &FilterContext) -> StoreResult<Vec<EnrollmentRecord>> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.load_gates.lock().get(&context.school_id).cloned();
        pass(gate).await;

        if let Some(error) = self.load_failures.lock().pop_front() {
            return Err(error);
        }
        self.inner.list_unassigned(context).await
    }
}

#[async_trait::async_trait]
impl ClassroomStore for ScriptedStore {
    async fn list_classrooms(&self, context: &FilterContext) -> StoreResult<Vec<ClassroomRecord>> {
        let gate = self.load_gates.lock().get(&context.school_id).cloned();
        pass(gate).await;
        self.inner.list_classrooms(context).await
    }
}

#[async_trait::async_trait]
impl AssignmentStore for ScriptedStore {
    async fn assign(&self, request: &AssignmentRequest) -> StoreResult<AssignmentAck> {
        self.assign_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.assign_gate.lock().clone();
        pass(gate).await;

        let delay = *self.assign_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.assign_failures.lock().pop_front() {
            return Err(error);
        }
        self.inner.assign(request).await
    }
}

impl Store for ScriptedStore {}
