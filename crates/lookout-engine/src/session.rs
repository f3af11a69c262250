//! One search session: store, dispatcher and reconciler wired together.
//!
//! `SearchSession` is synchronous and clock-injected. The async loop in
//! `driver` feeds it real time, user actions and gateway completions.

use std::sync::mpsc;
use std::time::Instant;

use lookout_core::config::LookoutConfig;
use lookout_core::error::{Error, GatewayFailure, Result};
use lookout_core::types::{GatewayRequest, GatewayResponse, Outcome, QueryState, ResultSet, SearchRequest, SeqNo, SortKey};
use tracing::debug;

use crate::dispatcher::Dispatcher;
use crate::facets::{facet_options, FacetOption, FacetQuery};
use crate::hits::{hit_cards, HitCard, HitLayout};
use crate::observable::SubscriptionId;
use crate::reconciler::{ErrorIndicator, Reconciler, Verdict};
use crate::store::{Change, QueryStore, StateUpdate};

/// A user interaction, as delivered to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetTerm(String),
    ToggleFilter { facet: String, value: String },
    ClearFacet(String),
    SetSort(SortKey),
    SetPage(u32),
    Reset,
    /// Search again with the unchanged state.
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    AwaitingResponse,
    Displaying,
}

/// A request ready to be sent: the numbered snapshot and its gateway form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub request: SearchRequest,
    pub gateway: GatewayRequest,
}

#[derive(Debug)]
pub struct SearchSession {
    store: QueryStore,
    dispatcher: Dispatcher,
    reconciler: Reconciler,
    changes: mpsc::Receiver<Change>,
    store_subscription: SubscriptionId,
    phase: Phase,
}

impl SearchSession {
    pub fn new(config: &LookoutConfig) -> Result<Self> {
        config.validate()?;
        let default_sort = config
            .default_sort()
            .ok_or_else(|| Error::InvalidConfig("no default sort strategy".into()))?
            .key
            .clone();
        Ok(Self::from_parts(QueryStore::new(default_sort), Dispatcher::from_config(config), Reconciler::new()))
    }

    pub fn from_parts(mut store: QueryStore, dispatcher: Dispatcher, reconciler: Reconciler) -> Self {
        let (tx, changes) = mpsc::channel();
        let store_subscription = store.subscribe(move |update: &StateUpdate| {
            let _ = tx.send(update.change);
        });
        Self { store, dispatcher, reconciler, changes, store_subscription, phase: Phase::Idle }
    }

    /// Apply a user action and let the dispatcher observe the resulting change.
    pub fn handle(&mut self, action: Action, now: Instant) -> Option<Change> {
        let change = match action {
            Action::SetTerm(term) => self.store.set_term(term),
            Action::ToggleFilter { facet, value } => self.store.toggle_filter(&facet, &value),
            Action::ClearFacet(facet) => self.store.clear_facet(&facet),
            Action::SetSort(sort) => self.store.set_sort(sort),
            Action::SetPage(page) => self.store.set_page(page),
            Action::Reset => self.store.reset(),
            Action::Refresh => {
                self.dispatcher.refresh();
                self.transition(Phase::Debouncing);
                None
            }
        };
        self.pump(now);
        change
    }

    fn pump(&mut self, now: Instant) {
        let mut observed = false;
        while let Ok(change) = self.changes.try_recv() {
            self.dispatcher.observe(change, now);
            observed = true;
        }
        if observed {
            self.transition(Phase::Debouncing);
        }
    }

    /// The next request, if the dispatcher says one is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Dispatch> {
        self.pump(now);
        let request = self.dispatcher.poll(now, self.store.state())?;
        self.reconciler.issued(request.seq);
        let gateway = self.dispatcher.gateway_request(&request);
        self.transition(Phase::AwaitingResponse);
        Some(Dispatch { request, gateway })
    }

    /// Feed back a finished gateway call.
    pub fn settle(&mut self, seq: SeqNo, result: std::result::Result<GatewayResponse, GatewayFailure>) -> Verdict {
        let outcome = self.dispatcher.settle(seq, result);
        self.deliver(outcome)
    }

    pub fn deliver(&mut self, outcome: Outcome) -> Verdict {
        let verdict = self.reconciler.handle(outcome);
        let next = if self.dispatcher.has_pending() {
            Phase::Debouncing
        } else if self.awaiting_newer() {
            Phase::AwaitingResponse
        } else if self.reconciler.current().is_some() {
            Phase::Displaying
        } else {
            Phase::Idle
        };
        self.transition(next);
        verdict
    }

    fn awaiting_newer(&self) -> bool {
        match (self.dispatcher.newest_in_flight(), self.reconciler.last_accepted()) {
            (Some(newest), Some(accepted)) => newest > accepted,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn transition(&mut self, next: Phase) {
        if self.phase != next {
            debug!(target: "lookout::session", from = ?self.phase, to = ?next, "phase change");
            self.phase = next;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.dispatcher.next_deadline()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &QueryState {
        self.store.state()
    }

    pub fn result(&self) -> Option<&ResultSet> {
        self.reconciler.current()
    }

    pub fn error(&self) -> Option<&ErrorIndicator> {
        self.reconciler.error()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn facet_options(&self, facet: &str, query: &FacetQuery) -> Vec<FacetOption> {
        facet_options(facet, self.result().map(|r| &**r), self.store.state(), query)
    }

    pub fn hit_cards(&self, layout: &HitLayout) -> Vec<HitCard> {
        hit_cards(self.result().map(|r| &**r), layout)
    }

    pub fn subscribe_state<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StateUpdate) + Send + 'static,
    {
        self.store.subscribe(listener)
    }

    pub fn subscribe_results<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ResultSet) + Send + 'static,
    {
        self.reconciler.subscribe(listener)
    }

    pub fn subscribe_errors<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ErrorIndicator) + Send + 'static,
    {
        self.reconciler.subscribe_errors(listener)
    }

    /// Remove a listener registered through this session. The dispatcher's
    /// own store subscription cannot be removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if id == self.store_subscription {
            return false;
        }
        self.store.unsubscribe(id) || self.reconciler.unsubscribe(id)
    }
}
