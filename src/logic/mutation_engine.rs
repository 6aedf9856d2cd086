use crate::error::StoreError;
use crate::logic::move_validator::{MoveValidator, Verdict};
use crate::logic::roster_store::RosterStore;
use crate::model::{
    AssignmentRequest, FilterContext, Id, MoveIntent, MoveOutcome, MoveState, Notice, Partition,
    PendingMove, Rejection,
};
use crate::store::traits::Store;
use chrono::Utc;
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Handle on an admitted, locally applied move awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTicket {
    pub id: u64,
    pub enrollment_id: Id,
    pub from: Partition,
    pub to: Partition,
    pub context: FilterContext,
    /// Load seq of the snapshot the move was applied to
    pub roster_seq: u64,
}

/// Drives a move from intent to settlement: validate, apply locally,
/// confirm remotely, and reload on failure.
pub struct MutationEngine<S: Store> {
    store: Arc<S>,
    roster: RosterStore<S>,
    pending: Arc<Mutex<HashMap<Id, PendingMove>>>,
    next_ticket: Arc<AtomicU64>,
    confirm_timeout: Duration,
}

impl<S: Store> Clone for MutationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            roster: self.roster.clone(),
            pending: Arc::clone(&self.pending),
            next_ticket: Arc::clone(&self.next_ticket),
            confirm_timeout: self.confirm_timeout,
        }
    }
}

impl<S: Store> MutationEngine<S> {
    pub fn new(store: Arc<S>, roster: RosterStore<S>, confirm_timeout: Duration) -> Self {
        Self {
            store,
            roster,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: Arc::new(AtomicU64::new(1)),
            confirm_timeout,
        }
    }

    /// Validate the intent and, if admitted, apply it to the roster and
    /// register it as pending. Nothing is sent to the server yet.
    pub fn begin_move(&self, intent: &MoveIntent) -> Result<MoveTicket, Rejection> {
        let mut pending = self.pending.lock();

        let admitted = self
            .roster
            .update_snapshot(|snapshot, installed_seq| {
                // A drop back onto the source is a no-op whatever the snapshot says
                if intent.from == intent.to {
                    return Err(Rejection::SameDestination(intent.to.clone()));
                }

                let (actual, enrollment) = snapshot.locate(&intent.enrollment_id).ok_or_else(|| {
                    Rejection::UnknownEnrollment {
                        enrollment_id: intent.enrollment_id.clone(),
                    }
                })?;
                if actual != &intent.from {
                    return Err(Rejection::StaleSource {
                        enrollment_id: intent.enrollment_id.clone(),
                        claimed: intent.from.clone(),
                        actual: actual.clone(),
                    });
                }

                // Entries left over from a superseded context do not block
                let already_pending = pending
                    .get(&intent.enrollment_id)
                    .is_some_and(|p| &p.context == snapshot.context());

                let enrollment = enrollment.clone();
                match MoveValidator::can_move(&enrollment, &intent.to, snapshot, already_pending) {
                    Verdict::Reject(rejection) => Err(rejection),
                    Verdict::Admit => {
                        if snapshot.apply_move(&intent.enrollment_id, &intent.from, &intent.to) {
                            Ok((snapshot.context().clone(), installed_seq))
                        } else {
                            Err(Rejection::UnknownEnrollment {
                                enrollment_id: intent.enrollment_id.clone(),
                            })
                        }
                    }
                }
            })
            .unwrap_or(Err(Rejection::RosterNotReady));

        let (context, roster_seq) = match admitted {
            Ok(admitted) => admitted,
            Err(rejection) => {
                info!("Move of enrollment '{}' rejected: {}", intent.enrollment_id, rejection);
                return Err(rejection);
            }
        };

        let ticket = MoveTicket {
            id: self.next_ticket.fetch_add(1, Ordering::Relaxed),
            enrollment_id: intent.enrollment_id.clone(),
            from: intent.from.clone(),
            to: intent.to.clone(),
            context: context.clone(),
            roster_seq,
        };
        pending.insert(
            intent.enrollment_id.clone(),
            PendingMove {
                ticket: ticket.id,
                enrollment_id: intent.enrollment_id.clone(),
                from_partition: intent.from.clone(),
                to_partition: intent.to.clone(),
                context,
                state: MoveState::Confirming,
                dispatched_at: Utc::now(),
            },
        );
        info!(
            "Enrollment '{}' moved locally {} -> {} (ticket {})",
            ticket.enrollment_id, ticket.from, ticket.to, ticket.id
        );

        Ok(ticket)
    }

    /// Send the assignment for an admitted move and settle it.
    ///
    /// Any failure, including a conflict or a timeout, reloads the roster
    /// from the server instead of undoing the local move.
    pub async fn confirm(&self, ticket: MoveTicket) -> MoveOutcome {
        let request = AssignmentRequest::new(
            ticket.enrollment_id.clone(),
            ticket.to.classroom_id().cloned(),
            &ticket.context,
        );

        let result = match tokio::time::timeout(self.confirm_timeout, self.store.assign(&request)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        };

        match result {
            Ok(_) => {
                let current = self.roster.is_active(&ticket.context);
                if current {
                    self.reapply_after_reload(&ticket);
                }
                self.finish(&ticket);
                if current {
                    info!("Move of enrollment '{}' confirmed (ticket {})", ticket.enrollment_id, ticket.id);
                    MoveOutcome::Settled
                } else {
                    info!(
                        "Move of enrollment '{}' confirmed after its context was left",
                        ticket.enrollment_id
                    );
                    MoveOutcome::Discarded
                }
            }
            Err(error) => self.roll_back(&ticket, error).await,
        }
    }

    /// A reload that landed while the move was confirming was fetched before
    /// the server applied it, so put the enrollment where the server has it.
    fn reapply_after_reload(&self, ticket: &MoveTicket) {
        let reapplied = self.roster.update_snapshot(|snapshot, installed_seq| {
            if installed_seq == ticket.roster_seq || snapshot.context() != &ticket.context {
                return Err(());
            }
            let Some((at, _)) = snapshot.locate(&ticket.enrollment_id) else {
                warn!(
                    "Confirmed enrollment '{}' is missing from the reloaded roster",
                    ticket.enrollment_id
                );
                return Err(());
            };
            if at == &ticket.to {
                return Err(());
            }
            let at = at.clone();
            if snapshot.apply_move(&ticket.enrollment_id, &at, &ticket.to) {
                Ok(at)
            } else {
                Err(())
            }
        });

        if let Some(Ok(from)) = reapplied {
            info!(
                "Re-applied confirmed move of enrollment '{}' {} -> {} over a reloaded roster",
                ticket.enrollment_id, from, ticket.to
            );
        }
    }

    async fn roll_back(&self, ticket: &MoveTicket, error: StoreError) -> MoveOutcome {
        warn!(
            "Move of enrollment '{}' failed (ticket {}): {}",
            ticket.enrollment_id, ticket.id, error
        );

        if !self.is_current(ticket) || !self.roster.is_active(&ticket.context) {
            self.finish(ticket);
            info!("Skipping rollback for stale ticket {}", ticket.id);
            return MoveOutcome::Discarded;
        }

        self.set_state(ticket, MoveState::RollingBack);
        if let Err(reload_error) = self.roster.revert_to_server_truth(&ticket.context).await {
            warn!("Reload after failed move also failed: {}", reload_error);
        }
        self.finish(ticket);

        MoveOutcome::RolledBack {
            notice: Notice::assignment_failed(error.server_message()),
        }
    }

    /// Validate, apply and confirm in one call
    pub async fn submit(&self, intent: &MoveIntent) -> Result<MoveOutcome, Rejection> {
        let ticket = self.begin_move(intent)?;
        Ok(self.confirm(ticket).await)
    }

    fn is_current(&self, ticket: &MoveTicket) -> bool {
        self.pending
            .lock()
            .get(&ticket.enrollment_id)
            .is_some_and(|p| p.ticket == ticket.id)
    }

    fn set_state(&self, ticket: &MoveTicket, state: MoveState) {
        if let Some(entry) = self.pending.lock().get_mut(&ticket.enrollment_id) {
            if entry.ticket == ticket.id {
                entry.state = state;
            }
        }
    }

    /// Clear the pending entry, but only if it still belongs to this ticket
    fn finish(&self, ticket: &MoveTicket) {
        let mut pending = self.pending.lock();
        if pending
            .get(&ticket.enrollment_id)
            .is_some_and(|p| p.ticket == ticket.id)
        {
            pending.remove(&ticket.enrollment_id);
        }
    }

    pub fn state_of(&self, enrollment_id: &str) -> MoveState {
        self.pending
            .lock()
            .get(enrollment_id)
            .map(|p| p.state)
            .unwrap_or_default()
    }

    pub fn pending_moves(&self) -> Vec<PendingMove> {
        let mut moves: Vec<PendingMove> = self.pending.lock().values().cloned().collect();
        moves.sort_by_key(|p| p.ticket);
        moves
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }
}
