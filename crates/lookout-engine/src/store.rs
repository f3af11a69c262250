//! Query State Store: the single owner of the user's search intent.

use lookout_core::types::{QueryState, SortKey};
use tracing::debug;

use crate::observable::{Listeners, SubscriptionId};

/// What kind of mutation produced a notification. The dispatcher uses it to
/// decide between debouncing and immediate dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    Term,
    Filter,
    Sort,
    Page,
    Reset,
}

impl Change {
    pub fn is_term(self) -> bool {
        matches!(self, Change::Term)
    }
}

/// Delivered to store subscribers after every effective mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub change: Change,
    pub state: QueryState,
}

#[derive(Debug)]
pub struct QueryStore {
    state: QueryState,
    default_sort: SortKey,
    listeners: Listeners<StateUpdate>,
}

impl QueryStore {
    pub fn new(default_sort: SortKey) -> Self {
        Self { state: QueryState::new(default_sort.clone()), default_sort, listeners: Listeners::new() }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StateUpdate) + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Replace the free-text term. Resets the page.
    pub fn set_term(&mut self, term: impl Into<String>) -> Option<Change> {
        let term = term.into();
        if self.state.term == term && self.state.page == 0 {
            return None;
        }
        self.state.term = term;
        self.state.page = 0;
        self.commit(Change::Term)
    }

    /// Select `value` under `facet` if absent, deselect it if present. Resets the page.
    pub fn toggle_filter(&mut self, facet: &str, value: &str) -> Option<Change> {
        let values = self.state.filters.entry(facet.to_string()).or_default();
        if !values.remove(value) {
            values.insert(value.to_string());
        }
        if values.is_empty() {
            self.state.filters.remove(facet);
        }
        self.state.page = 0;
        self.commit(Change::Filter)
    }

    /// Drop every selection of one facet. Resets the page.
    pub fn clear_facet(&mut self, facet: &str) -> Option<Change> {
        self.state.filters.remove(facet)?;
        self.state.page = 0;
        self.commit(Change::Filter)
    }

    /// Switch the sort strategy. Resets the page.
    pub fn set_sort(&mut self, sort: SortKey) -> Option<Change> {
        if self.state.sort == sort && self.state.page == 0 {
            return None;
        }
        self.state.sort = sort;
        self.state.page = 0;
        self.commit(Change::Sort)
    }

    pub fn set_page(&mut self, page: u32) -> Option<Change> {
        if self.state.page == page {
            return None;
        }
        self.state.page = page;
        self.commit(Change::Page)
    }

    /// Back to session defaults.
    pub fn reset(&mut self) -> Option<Change> {
        let fresh = QueryState::new(self.default_sort.clone());
        if self.state == fresh {
            return None;
        }
        self.state = fresh;
        self.commit(Change::Reset)
    }

    fn commit(&mut self, change: Change) -> Option<Change> {
        debug!(target: "lookout::store", ?change, term = %self.state.term, page = self.state.page, "query state changed");
        let update = StateUpdate { change, state: self.state.clone() };
        self.listeners.notify(&update);
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn store() -> QueryStore {
        QueryStore::new(SortKey::from("relevance"))
    }

    #[test]
    fn starts_with_defaults() {
        let s = store();
        assert_eq!(s.state().term, "");
        assert!(s.state().filters.is_empty());
        assert_eq!(s.state().sort, SortKey::from("relevance"));
        assert_eq!(s.state().page, 0);
    }

    #[test]
    fn term_change_resets_page() {
        let mut s = store();
        s.set_page(3);
        assert_eq!(s.state().page, 3);
        assert_eq!(s.set_term("london"), Some(Change::Term));
        assert_eq!(s.state().page, 0);
    }

    #[test]
    fn filter_and_sort_reset_page_but_page_does_not() {
        let mut s = store();
        s.set_page(2);
        s.toggle_filter("country", "FR");
        assert_eq!(s.state().page, 0);
        s.set_page(4);
        s.set_sort(SortKey::from("population_desc"));
        assert_eq!(s.state().page, 0);
        s.set_page(5);
        assert_eq!(s.state().page, 5);
        assert_eq!(s.state().sort, SortKey::from("population_desc"));
    }

    #[test]
    fn unknown_facet_creates_selection() {
        let mut s = store();
        s.toggle_filter("continent", "Europe");
        assert!(s.state().is_selected("continent", "Europe"));
    }

    #[test]
    fn no_op_mutations_do_not_notify() {
        let mut s = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        s.subscribe(move |u| sink.lock().unwrap().push(u.change));

        assert_eq!(s.set_term(""), None);
        assert_eq!(s.set_page(0), None);
        assert_eq!(s.clear_facet("country"), None);
        assert_eq!(s.reset(), None);
        s.set_term("par");
        s.set_term("pari");
        s.reset();
        assert_eq!(*seen.lock().unwrap(), vec![Change::Term, Change::Term, Change::Reset]);
    }

    #[test]
    fn subscribers_see_post_mutation_state() {
        let mut s = store();
        let last = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&last);
        s.subscribe(move |u| *sink.lock().unwrap() = Some(u.state.clone()));
        s.toggle_filter("country", "DE");
        let state = last.lock().unwrap().clone().expect("notified");
        assert!(state.is_selected("country", "DE"));
    }

    #[test]
    fn clear_facet_removes_all_values() {
        let mut s = store();
        s.toggle_filter("country", "DE");
        s.toggle_filter("country", "FR");
        s.toggle_filter("timezone", "Europe/Paris");
        assert_eq!(s.clear_facet("country"), Some(Change::Filter));
        assert!(s.state().selected("country").is_none());
        assert!(s.state().is_selected("timezone", "Europe/Paris"));
    }

    proptest! {
        #[test]
        fn double_toggle_restores_selection(
            preselected in proptest::collection::btree_set("[a-c]{1,2}", 0..4),
            facet in "(country|timezone)",
            value in "[a-c]{1,2}",
        ) {
            let mut s = store();
            for v in &preselected {
                s.toggle_filter(&facet, v);
            }
            let before = s.state().filters.clone();
            s.toggle_filter(&facet, &value);
            s.toggle_filter(&facet, &value);
            prop_assert_eq!(&s.state().filters, &before);
        }
    }
}
