use crate::error::StoreError;
use crate::model::{ContainerSummary, Enrollment, FetchOutcome, FilterContext, Partition, RosterSnapshot};
use crate::store::traits::Store;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// What readers currently see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterStatus {
    /// No complete filter context; nothing to show
    Inert,
    Loading(FilterContext),
    Ready(RosterSnapshot),
    /// Context resolved but the fetch failed; distinct from an empty roster
    Unavailable { context: FilterContext, message: String },
}

impl RosterStatus {
    pub fn context(&self) -> Option<&FilterContext> {
        match self {
            RosterStatus::Inert => None,
            RosterStatus::Loading(context) | RosterStatus::Unavailable { context, .. } => Some(context),
            RosterStatus::Ready(snapshot) => Some(snapshot.context()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadTicket {
    seq: u64,
    context: FilterContext,
}

#[derive(Debug)]
struct RosterState {
    status: RosterStatus,
    /// The context the board is showing, or about to show
    active: Option<FilterContext>,
    /// Latest load issued; only its completion may be applied
    in_flight: Option<LoadTicket>,
    next_seq: u64,
    /// Seq of the load that installed the current snapshot
    installed_seq: u64,
}

/// Single source of truth for the enrollment partition of one resolved context.
///
/// Cloning yields another handle on the same state.
pub struct RosterStore<S: Store> {
    store: Arc<S>,
    state: Arc<Mutex<RosterState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl<S: Store> Clone for RosterStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            revision: Arc::clone(&self.revision),
        }
    }
}

impl<S: Store> RosterStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            store,
            state: Arc::new(Mutex::new(RosterState {
                status: RosterStatus::Inert,
                active: None,
                in_flight: None,
                next_seq: 0,
                installed_seq: 0,
            })),
            revision: Arc::new(revision),
        }
    }

    /// Receives a new revision number after every visible change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Fetch and atomically install the roster for `context`.
    ///
    /// A completion whose ticket was superseded by a newer load or a
    /// `clear` is dropped and reported as `Superseded`.
    pub async fn load(&self, context: FilterContext) -> Result<FetchOutcome<()>, StoreError> {
        let ticket = {
            let mut state = self.state.lock();
            state.next_seq += 1;
            let ticket = LoadTicket {
                seq: state.next_seq,
                context: context.clone(),
            };
            state.in_flight = Some(ticket.clone());

            // Keep the current snapshot visible while refreshing the same context
            let refreshing = matches!(&state.status, RosterStatus::Ready(s) if s.context() == &context);
            if !refreshing {
                state.status = RosterStatus::Loading(context.clone());
            }
            state.active = Some(context.clone());
            ticket
        };
        self.bump();
        debug!("Loading roster for {} (ticket {})", context, ticket.seq);

        let fetched = tokio::try_join!(
            self.store.list_unassigned(&context),
            self.store.list_classrooms(&context)
        );

        let mut state = self.state.lock();
        if state.in_flight.as_ref() != Some(&ticket) {
            info!("Discarding superseded roster response for {}", context);
            return Ok(FetchOutcome::Superseded);
        }
        state.in_flight = None;

        let outcome = match fetched {
            Ok((unassigned, classrooms)) => {
                let snapshot = RosterSnapshot::from_records(context.clone(), unassigned, classrooms);
                info!(
                    "Roster loaded for {}: {} enrollments in {} classrooms",
                    context,
                    snapshot.enrollment_count(),
                    snapshot.classrooms().len()
                );
                state.status = RosterStatus::Ready(snapshot);
                state.installed_seq = ticket.seq;
                Ok(FetchOutcome::Applied(()))
            }
            Err(error) => {
                warn!("Roster unavailable for {}: {}", context, error);
                state.status = RosterStatus::Unavailable {
                    context: context.clone(),
                    message: error.to_string(),
                };
                Err(error)
            }
        };
        drop(state);
        self.bump();
        outcome
    }

    /// Reload `context` from the server, discarding any speculative local moves
    pub async fn revert_to_server_truth(
        &self,
        context: &FilterContext,
    ) -> Result<FetchOutcome<()>, StoreError> {
        self.load(context.clone()).await
    }

    /// Evict the roster; any load still in flight will be discarded
    pub fn clear(&self) {
        {
            let mut state = self.state.lock();
            state.status = RosterStatus::Inert;
            state.active = None;
            state.in_flight = None;
        }
        self.bump();
    }

    pub fn status(&self) -> RosterStatus {
        self.state.lock().status.clone()
    }

    pub fn active_context(&self) -> Option<FilterContext> {
        self.state.lock().active.clone()
    }

    pub fn is_active(&self, context: &FilterContext) -> bool {
        self.state.lock().active.as_ref() == Some(context)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.state.lock().status, RosterStatus::Unavailable { .. })
    }

    pub fn snapshot(&self) -> Option<RosterSnapshot> {
        self.with_snapshot(RosterSnapshot::clone)
    }

    /// Read the ready snapshot without cloning it
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&RosterSnapshot) -> R) -> Option<R> {
        match &self.state.lock().status {
            RosterStatus::Ready(snapshot) => Some(f(snapshot)),
            _ => None,
        }
    }

    /// Mutate the ready snapshot under the roster lock.
    ///
    /// `f` also receives the seq of the load that installed the snapshot.
    /// Readers observe a new revision only when `f` returns `Ok`; `None`
    /// means there was no ready snapshot to mutate.
    pub(crate) fn update_snapshot<R, E>(
        &self,
        f: impl FnOnce(&mut RosterSnapshot, u64) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        let result = {
            let mut state = self.state.lock();
            let installed_seq = state.installed_seq;
            match &mut state.status {
                RosterStatus::Ready(snapshot) => Some(f(snapshot, installed_seq)),
                _ => None,
            }
        };
        if matches!(result, Some(Ok(_))) {
            self.bump();
        }
        result
    }

    pub fn get_unassigned(&self) -> Vec<Enrollment> {
        self.with_snapshot(|s| s.unassigned().to_vec()).unwrap_or_default()
    }

    pub fn get_occupants(&self, classroom_id: &str) -> Vec<Enrollment> {
        self.with_snapshot(|s| s.occupants(classroom_id).map(<[Enrollment]>::to_vec))
            .flatten()
            .unwrap_or_default()
    }

    pub fn containers(&self) -> Vec<ContainerSummary> {
        self.with_snapshot(RosterSnapshot::containers)
            .unwrap_or_default()
    }

    /// Move an enrollment between partitions of the ready snapshot.
    ///
    /// An enrollment missing from `from` is a no-op: drift that the next
    /// reload corrects.
    pub fn apply_move_locally(&self, enrollment_id: &str, from: &Partition, to: &Partition) -> bool {
        let applied = self
            .update_snapshot(|snapshot, _| {
                if snapshot.apply_move(enrollment_id, from, to) {
                    Ok(())
                } else {
                    Err(())
                }
            })
            .is_some_and(|result| result.is_ok());

        if applied {
            debug!("Applied {} -> {} for enrollment '{}'", from, to, enrollment_id);
        } else {
            warn!(
                "Ignoring local move of enrollment '{}' from {} to {}: not found where expected",
                enrollment_id, from, to
            );
        }
        applied
    }
}
