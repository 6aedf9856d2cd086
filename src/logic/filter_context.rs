use crate::error::ContextError;
use crate::logic::roster_store::RosterStore;
use crate::model::{is_blank, FetchOutcome, FilterContext, FilterSelection, GradeLevel, PeriodMode};
use crate::store::traits::Store;
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ResolverState {
    selection: FilterSelection,
    /// Grade levels of the selected school, once fetched
    grade_levels: Option<Vec<GradeLevel>>,
    grade_levels_seq: u64,
}

/// Holds the cascading school → period → grade selection.
///
/// Changing an upstream field clears everything downstream, including the
/// roster; completing the triple loads the roster.
pub struct FilterContextResolver<S: Store> {
    store: Arc<S>,
    roster: RosterStore<S>,
    mode: PeriodMode,
    state: Arc<Mutex<ResolverState>>,
}

impl<S: Store> Clone for FilterContextResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            roster: self.roster.clone(),
            mode: self.mode,
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: Store> FilterContextResolver<S> {
    pub fn new(store: Arc<S>, roster: RosterStore<S>, mode: PeriodMode) -> Self {
        Self {
            store,
            roster,
            mode,
            state: Arc::new(Mutex::new(ResolverState::default())),
        }
    }

    pub fn mode(&self) -> PeriodMode {
        self.mode
    }

    pub fn selection(&self) -> FilterSelection {
        self.state.lock().selection.clone()
    }

    pub fn context(&self) -> Option<FilterContext> {
        self.state.lock().selection.resolve()
    }

    pub fn grade_levels(&self) -> Option<Vec<GradeLevel>> {
        self.state.lock().grade_levels.clone()
    }

    /// Select a school, clearing period, grade and roster, then fetch its grade levels.
    ///
    /// A blank id clears the whole selection. The fetched grade levels are
    /// dropped if another school was selected meanwhile.
    pub async fn set_school(&self, school_id: &str) -> Result<FetchOutcome<Vec<GradeLevel>>, ContextError> {
        let seq = {
            let mut state = self.state.lock();
            state.selection = FilterSelection {
                school_id: (!is_blank(school_id)).then(|| school_id.to_string()),
                ..FilterSelection::default()
            };
            state.grade_levels = None;
            state.grade_levels_seq += 1;
            state.grade_levels_seq
        };
        self.roster.clear();

        if is_blank(school_id) {
            debug!("School selection cleared");
            return Ok(FetchOutcome::Applied(Vec::new()));
        }

        let school_id = school_id.to_string();
        let fetched = self.store.list_grade_levels(&school_id).await;

        let mut state = self.state.lock();
        if state.grade_levels_seq != seq {
            info!("Discarding grade levels for superseded school '{}'", school_id);
            return Ok(FetchOutcome::Superseded);
        }

        let grade_levels = fetched?;
        state.grade_levels = Some(grade_levels.clone());
        Ok(FetchOutcome::Applied(grade_levels))
    }

    /// Select an academic period; requires a school and clears the grade and roster
    pub fn set_period(&self, period: &str) -> Result<(), ContextError> {
        {
            let mut state = self.state.lock();
            if !state.selection.has_school() {
                return Err(ContextError::SchoolNotSelected);
            }
            state.selection.period = (!is_blank(period)).then(|| self.mode.period(period));
            state.selection.grade_level_id = None;
        }
        self.roster.clear();
        Ok(())
    }

    /// Select a grade level; completing the selection loads the roster
    pub async fn set_grade(&self, grade_level_id: &str) -> Result<FetchOutcome<()>, ContextError> {
        let context = {
            let mut state = self.state.lock();
            if !state.selection.has_school() {
                return Err(ContextError::SchoolNotSelected);
            }
            if !state.selection.has_period() {
                return Err(ContextError::PeriodNotSelected);
            }

            let offered = state.grade_levels.as_ref().map_or(true, |levels| {
                levels.iter().any(|level| level.grade_level_id == grade_level_id)
            });
            if is_blank(grade_level_id) || !offered {
                return Err(ContextError::UnknownGradeLevel(grade_level_id.to_string()));
            }

            state.selection.grade_level_id = Some(grade_level_id.to_string());
            state.selection.resolve()
        };

        let Some(context) = context else {
            return Err(ContextError::PeriodNotSelected);
        };
        info!("Filter context resolved: {}", context);
        Ok(self.roster.load(context).await?)
    }

    /// Drop the grade selection and the roster
    pub fn clear_grade(&self) {
        self.state.lock().selection.grade_level_id = None;
        self.roster.clear();
    }

    /// Reload the roster for the current context, e.g. after "roster unavailable"
    pub async fn reload(&self) -> Result<FetchOutcome<()>, ContextError> {
        let selection = self.selection();
        let Some(context) = selection.resolve() else {
            return Err(if !selection.has_school() {
                ContextError::SchoolNotSelected
            } else {
                ContextError::PeriodNotSelected
            });
        };
        Ok(self.roster.load(context).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::logic::roster_store::RosterStatus;
    use crate::store::testing::{fixture_context, ScriptedStore};

    fn resolver(store: Arc<ScriptedStore>) -> FilterContextResolver<ScriptedStore> {
        let roster = RosterStore::new(store.clone());
        FilterContextResolver::new(store, roster, PeriodMode::AcademicYearName)
    }

    #[tokio::test]
    async fn test_full_selection_loads_roster() {
        let store = ScriptedStore::fixture();
        let resolver = resolver(store.clone());

        let levels = resolver.set_school("1").await.unwrap();
        let FetchOutcome::Applied(levels) = levels else {
            panic!("grade levels should apply");
        };
        assert_eq!(levels.len(), 2);

        resolver.set_period("2024/2025").unwrap();
        assert_eq!(resolver.roster.status(), RosterStatus::Inert);

        let outcome = resolver.set_grade("5").await.unwrap();
        assert!(outcome.is_applied());
        assert_eq!(resolver.context(), Some(fixture_context()));
        assert_eq!(resolver.roster.get_unassigned().len(), 3);
    }

    #[tokio::test]
    async fn test_out_of_order_selection_is_refused() {
        let store = ScriptedStore::fixture();
        let resolver = resolver(store.clone());

        assert_eq!(resolver.set_period("2024/2025"), Err(ContextError::SchoolNotSelected));
        assert_eq!(
            resolver.set_grade("5").await,
            Err(ContextError::SchoolNotSelected)
        );

        resolver.set_school("1").await.unwrap();
        assert_eq!(
            resolver.set_grade("5").await,
            Err(ContextError::PeriodNotSelected)
        );

        resolver.set_period("2024/2025").unwrap();
        assert_eq!(
            resolver.set_grade("12").await,
            Err(ContextError::UnknownGradeLevel("12".to_string()))
        );
        assert_eq!(store.load_calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_change_clears_downstream() {
        let store = ScriptedStore::fixture();
        let resolver = resolver(store.clone());
        resolver.set_school("1").await.unwrap();
        resolver.set_period("2024/2025").unwrap();
        resolver.set_grade("5").await.unwrap();

        resolver.set_period("2023/2024").unwrap();
        assert_eq!(resolver.selection().grade_level_id, None);
        assert_eq!(resolver.roster.status(), RosterStatus::Inert);

        resolver.set_grade("5").await.unwrap();
        resolver.set_school("2").await.unwrap();
        let selection = resolver.selection();
        assert_eq!(selection.school_id.as_deref(), Some("2"));
        assert_eq!(selection.period, None);
        assert_eq!(selection.grade_level_id, None);
        assert_eq!(resolver.roster.status(), RosterStatus::Inert);
    }

    #[tokio::test]
    async fn test_school_switch_discards_stale_roster() {
        let store = ScriptedStore::fixture();
        let resolver = resolver(store.clone());
        resolver.set_school("1").await.unwrap();
        resolver.set_period("2024/2025").unwrap();

        store.hold_loads_for("1");
        let slow = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.set_grade("5").await }
        });
        tokio::task::yield_now().await;

        resolver.set_school("2").await.unwrap();
        resolver.set_period("2024/2025").unwrap();
        resolver.set_grade("5").await.unwrap();

        store.release_loads_for("1");
        assert_eq!(slow.await.unwrap().unwrap(), FetchOutcome::Superseded);

        let snapshot = resolver.roster.snapshot().unwrap();
        assert_eq!(snapshot.context().school_id, "2");
        assert!(snapshot.locate("e-ada").is_none());
        assert!(snapshot.locate("e-barbara").is_some());
    }

    #[tokio::test]
    async fn test_stale_grade_levels_are_discarded() {
        let store = ScriptedStore::fixture();
        let resolver = resolver(store.clone());
        store.hold_grade_levels_for("1");

        let slow = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.set_school("1").await }
        });
        tokio::task::yield_now().await;

        resolver.set_school("2").await.unwrap();
        store.release_grade_levels_for("1");

        assert_eq!(slow.await.unwrap().unwrap(), FetchOutcome::Superseded);
        let levels = resolver.grade_levels().unwrap();
        assert_eq!(levels.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_after_failure() {
        let store = ScriptedStore::fixture();
        let resolver = resolver(store.clone());
        resolver.set_school("1").await.unwrap();
        resolver.set_period("2024/2025").unwrap();

        store.fail_next_load(StoreError::Transport("connection reset".to_string()));
        let result = resolver.set_grade("5").await;
        assert!(matches!(result, Err(ContextError::Store(StoreError::Transport(_)))));
        assert!(resolver.roster.is_unavailable());

        resolver.reload().await.unwrap();
        assert_eq!(resolver.roster.get_unassigned().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_school_clears_everything() {
        let store = ScriptedStore::fixture();
        let resolver = resolver(store.clone());
        resolver.set_school("1").await.unwrap();

        resolver.set_school("  ").await.unwrap();
        assert_eq!(resolver.selection(), FilterSelection::default());
        assert_eq!(resolver.reload().await, Err(ContextError::SchoolNotSelected));
    }
}
