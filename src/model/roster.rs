use crate::model::common::compare_display_names;
use crate::model::{ClassroomRecord, EnrollmentRecord, FilterContext, Id};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A student's participation record for one academic context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub enrollment_id: Id,
    pub student_id: Id,
    pub student_display_name: String,
    /// `None` means unassigned
    pub classroom_id: Option<Id>,
}

impl Enrollment {
    fn from_record(record: EnrollmentRecord, classroom_id: Option<Id>) -> Self {
        Self {
            enrollment_id: record.enrollment_id,
            student_id: record.student_id,
            student_display_name: record.student_name,
            classroom_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub classroom_id: Id,
    pub display_name: String,
    pub capacity: u32,
}

/// Either the unassigned pool or one classroom's occupant set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "classroom_id", rename_all = "snake_case")]
pub enum Partition {
    Unassigned,
    Classroom(Id),
}

impl Partition {
    pub fn from_classroom_id(classroom_id: Option<Id>) -> Self {
        match classroom_id {
            Some(id) => Partition::Classroom(id),
            None => Partition::Unassigned,
        }
    }

    pub fn classroom_id(&self) -> Option<&Id> {
        match self {
            Partition::Unassigned => None,
            Partition::Classroom(id) => Some(id),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Unassigned => f.write_str("unassigned"),
            Partition::Classroom(id) => write!(f, "classroom {}", id),
        }
    }
}

/// One renderable container: the unassigned pool or a classroom
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub partition: Partition,
    pub display_name: String,
    pub occupancy: usize,
    /// `None` for the unassigned pool
    pub capacity: Option<u32>,
}

impl ContainerSummary {
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.occupancy >= capacity as usize)
    }
}

/// The partition of one context's enrollments into unassigned and per-classroom buckets.
///
/// Every enrollment sits in exactly one partition; each partition is kept
/// ordered by student display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    context: FilterContext,
    classrooms: Vec<Classroom>,
    partitions: HashMap<Partition, Vec<Enrollment>>,
}

impl RosterSnapshot {
    /// Build a snapshot from the two roster fetches.
    ///
    /// Duplicates are resolved in favour of a classroom over the unassigned
    /// pool, and of the first classroom listed over later ones. A classroom
    /// listed twice keeps its first name and capacity; occupants of both
    /// listings are merged.
    pub fn from_records(
        context: FilterContext,
        unassigned: Vec<EnrollmentRecord>,
        classrooms: Vec<ClassroomRecord>,
    ) -> Self {
        let mut seen: HashSet<Id> = HashSet::new();
        let mut partitions: HashMap<Partition, Vec<Enrollment>> = HashMap::new();
        let mut rooms = Vec::with_capacity(classrooms.len());

        for record in classrooms {
            let partition = Partition::Classroom(record.classroom_id.clone());
            if partitions.contains_key(&partition) {
                warn!(
                    "Classroom '{}' listed twice for {}; merging its occupants into the first listing",
                    record.classroom_id, context
                );
            } else {
                rooms.push(Classroom {
                    classroom_id: record.classroom_id.clone(),
                    display_name: record.name.clone(),
                    capacity: record.capacity,
                });
            }

            let occupants = partitions.entry(partition).or_default();
            for occupant in record.occupant_enrollments {
                if !seen.insert(occupant.enrollment_id.clone()) {
                    warn!(
                        "Enrollment '{}' listed in more than one classroom; dropping it from '{}'",
                        occupant.enrollment_id, record.classroom_id
                    );
                    continue;
                }
                occupants.push(Enrollment::from_record(
                    occupant,
                    Some(record.classroom_id.clone()),
                ));
            }
        }

        for room in &rooms {
            if let Some(occupants) = partitions.get_mut(&Partition::Classroom(room.classroom_id.clone())) {
                if occupants.len() > room.capacity as usize {
                    warn!(
                        "Classroom '{}' loaded over capacity ({}/{})",
                        room.classroom_id,
                        occupants.len(),
                        room.capacity
                    );
                }
                sort_by_display_name(occupants);
            }
        }

        let mut pool = Vec::with_capacity(unassigned.len());
        for record in unassigned {
            if !seen.insert(record.enrollment_id.clone()) {
                warn!(
                    "Enrollment '{}' listed as unassigned and assigned; keeping the assignment",
                    record.enrollment_id
                );
                continue;
            }
            pool.push(Enrollment::from_record(record, None));
        }
        sort_by_display_name(&mut pool);
        partitions.insert(Partition::Unassigned, pool);

        rooms.sort_by(|a, b| {
            compare_display_names(&a.display_name, &a.classroom_id, &b.display_name, &b.classroom_id)
        });

        Self {
            context,
            classrooms: rooms,
            partitions,
        }
    }

    pub fn context(&self) -> &FilterContext {
        &self.context
    }

    pub fn classrooms(&self) -> &[Classroom] {
        &self.classrooms
    }

    pub fn classroom(&self, classroom_id: &str) -> Option<&Classroom> {
        self.classrooms
            .iter()
            .find(|classroom| classroom.classroom_id == classroom_id)
    }

    pub fn unassigned(&self) -> &[Enrollment] {
        self.partition(&Partition::Unassigned).unwrap_or(&[])
    }

    pub fn occupants(&self, classroom_id: &str) -> Option<&[Enrollment]> {
        self.partition(&Partition::Classroom(classroom_id.to_string()))
    }

    pub fn partition(&self, partition: &Partition) -> Option<&[Enrollment]> {
        self.partitions.get(partition).map(Vec::as_slice)
    }

    /// Occupancy computed from the current partition contents
    pub fn occupancy(&self, classroom_id: &str) -> Option<usize> {
        self.occupants(classroom_id).map(<[Enrollment]>::len)
    }

    /// Find which partition currently holds an enrollment
    pub fn locate(&self, enrollment_id: &str) -> Option<(&Partition, &Enrollment)> {
        self.partitions.iter().find_map(|(partition, members)| {
            members
                .iter()
                .find(|enrollment| enrollment.enrollment_id == enrollment_id)
                .map(|enrollment| (partition, enrollment))
        })
    }

    pub fn enrollment_count(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }

    /// All enrollments, unassigned pool first, then classrooms in display order
    pub fn enrollments(&self) -> impl Iterator<Item = &Enrollment> + '_ {
        self.unassigned().iter().chain(
            self.classrooms
                .iter()
                .filter_map(|classroom| self.occupants(&classroom.classroom_id))
                .flatten(),
        )
    }

    /// The N+1 containers a board renders
    pub fn containers(&self) -> Vec<ContainerSummary> {
        let mut containers = Vec::with_capacity(self.classrooms.len() + 1);
        containers.push(ContainerSummary {
            partition: Partition::Unassigned,
            display_name: "Unassigned".to_string(),
            occupancy: self.unassigned().len(),
            capacity: None,
        });

        for classroom in &self.classrooms {
            containers.push(ContainerSummary {
                partition: Partition::Classroom(classroom.classroom_id.clone()),
                display_name: classroom.display_name.clone(),
                occupancy: self.occupancy(&classroom.classroom_id).unwrap_or(0),
                capacity: Some(classroom.capacity),
            });
        }

        containers
    }

    /// Move an enrollment between two partitions.
    ///
    /// Returns `false` and leaves the snapshot untouched when the enrollment
    /// is not in `from` or `to` does not exist.
    pub fn apply_move(&mut self, enrollment_id: &str, from: &Partition, to: &Partition) -> bool {
        if from == to {
            return false;
        }
        if !self.partitions.contains_key(to) {
            debug!("Destination {} not present in snapshot", to);
            return false;
        }

        let Some(source) = self.partitions.get_mut(from) else {
            return false;
        };
        let Some(position) = source
            .iter()
            .position(|enrollment| enrollment.enrollment_id == enrollment_id)
        else {
            return false;
        };

        let mut enrollment = source.remove(position);
        enrollment.classroom_id = to.classroom_id().cloned();

        if let Some(destination) = self.partitions.get_mut(to) {
            destination.push(enrollment);
            sort_by_display_name(destination);
        }

        true
    }
}

fn sort_by_display_name(enrollments: &mut [Enrollment]) {
    enrollments.sort_by(|a, b| {
        compare_display_names(
            &a.student_display_name,
            &a.enrollment_id,
            &b.student_display_name,
            &b.enrollment_id,
        )
    });
}
