use crate::config::EngineConfig;
use crate::error::ContextError;
use crate::logic::filter_context::FilterContextResolver;
use crate::logic::mutation_engine::{MoveTicket, MutationEngine};
use crate::logic::roster_store::{RosterStatus, RosterStore};
use crate::model::{
    ContainerSummary, FetchOutcome, FilterSelection, GradeLevel, MoveIntent, MoveOutcome, MoveState,
    Notice, PendingMove, Rejection,
};
use crate::store::traits::Store;
use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

/// The assignment board: one filter selection, its roster and the moves on it.
///
/// Clones share all state, so a clone can confirm moves on another task.
pub struct AssignmentBoard<S: Store> {
    resolver: FilterContextResolver<S>,
    roster: RosterStore<S>,
    engine: MutationEngine<S>,
}

impl<S: Store> Clone for AssignmentBoard<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            roster: self.roster.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<S: Store> AssignmentBoard<S> {
    pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
        let roster = RosterStore::new(store.clone());
        let resolver = FilterContextResolver::new(store.clone(), roster.clone(), config.period_mode);
        let engine = MutationEngine::new(store, roster.clone(), config.confirm_timeout());
        Self {
            resolver,
            roster,
            engine,
        }
    }

    pub fn resolver(&self) -> &FilterContextResolver<S> {
        &self.resolver
    }

    pub fn roster(&self) -> &RosterStore<S> {
        &self.roster
    }

    pub fn engine(&self) -> &MutationEngine<S> {
        &self.engine
    }

    pub async fn set_school(&self, school_id: &str) -> Result<FetchOutcome<Vec<GradeLevel>>, ContextError> {
        self.resolver.set_school(school_id).await
    }

    pub fn set_period(&self, period: &str) -> Result<(), ContextError> {
        self.resolver.set_period(period)
    }

    pub async fn set_grade(&self, grade_level_id: &str) -> Result<FetchOutcome<()>, ContextError> {
        self.resolver.set_grade(grade_level_id).await
    }

    /// Reload the roster for the current selection
    pub async fn retry(&self) -> Result<FetchOutcome<()>, ContextError> {
        self.resolver.reload().await
    }

    pub fn selection(&self) -> FilterSelection {
        self.resolver.selection()
    }

    pub fn status(&self) -> RosterStatus {
        self.roster.status()
    }

    pub fn containers(&self) -> Vec<ContainerSummary> {
        self.roster.containers()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.roster.subscribe()
    }

    pub fn begin_move(&self, intent: &MoveIntent) -> Result<MoveTicket, Rejection> {
        self.engine.begin_move(intent)
    }

    pub async fn confirm(&self, ticket: MoveTicket) -> MoveOutcome {
        self.engine.confirm(ticket).await
    }

    pub async fn submit(&self, intent: &MoveIntent) -> Result<MoveOutcome, Rejection> {
        self.engine.submit(intent).await
    }

    /// Run a drag-and-drop intent to completion and return what the user should see, if anything
    pub async fn handle_intent(&self, intent: &MoveIntent) -> Option<Notice> {
        let notice = match self.engine.submit(intent).await {
            Ok(MoveOutcome::RolledBack { notice }) => Some(notice),
            Ok(_) => None,
            Err(rejection) => rejection.notice(),
        };
        if let Some(notice) = &notice {
            debug!("Notice for enrollment '{}': {}", intent.enrollment_id, notice);
        }
        notice
    }

    pub fn state_of(&self, enrollment_id: &str) -> MoveState {
        self.engine.state_of(enrollment_id)
    }

    pub fn pending_moves(&self) -> Vec<PendingMove> {
        self.engine.pending_moves()
    }
}
