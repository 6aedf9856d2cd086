use crate::model::{Enrollment, Partition, Rejection, RosterSnapshot};

/// Admit or refuse a proposed move. No I/O and no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Admit,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_admit(&self) -> bool {
        matches!(self, Verdict::Admit)
    }
}

pub struct MoveValidator;

impl MoveValidator {
    /// Decide a move of `enrollment` into `destination` against the current snapshot.
    ///
    /// Occupancy is read from `snapshot` as it stands, so prior optimistic
    /// moves already count against capacity.
    pub fn can_move(
        enrollment: &Enrollment,
        destination: &Partition,
        snapshot: &RosterSnapshot,
        already_pending: bool,
    ) -> Verdict {
        let current = Partition::from_classroom_id(enrollment.classroom_id.clone());
        if &current == destination {
            return Verdict::Reject(Rejection::SameDestination(current));
        }

        if let Partition::Classroom(classroom_id) = destination {
            let Some(classroom) = snapshot.classroom(classroom_id) else {
                return Verdict::Reject(Rejection::UnknownDestination {
                    classroom_id: classroom_id.clone(),
                });
            };

            let occupancy = snapshot.occupancy(classroom_id).unwrap_or(0);
            if occupancy + 1 > classroom.capacity as usize {
                return Verdict::Reject(Rejection::CapacityExceeded {
                    classroom_id: classroom_id.clone(),
                    display_name: classroom.display_name.clone(),
                    capacity: classroom.capacity,
                });
            }
        }

        if already_pending {
            return Verdict::Reject(Rejection::AlreadyPending {
                enrollment_id: enrollment.enrollment_id.clone(),
            });
        }

        Verdict::Admit
    }
}
