//! Request Dispatcher: turns query-state changes into numbered search requests.
//!
//! Term changes are debounced; filter, sort and page changes go out on the
//! next poll unless `debounce_all` is set. Whatever the cause, a dispatch
//! snapshots the whole state, so one request settles every pending cause.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use lookout_core::config::{LookoutConfig, SortStrategy};
use lookout_core::error::GatewayFailure;
use lookout_core::types::{GatewayRequest, GatewayResponse, Outcome, QueryState, SearchRequest, SearchResponse, SeqNo};
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::store::Change;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub debounce: Duration,
    pub debounce_all: bool,
}

impl DispatchPolicy {
    pub fn from_config(config: &LookoutConfig) -> Self {
        Self { debounce: config.debounce(), debounce_all: config.search.debounce_all }
    }
}

/// The startup-frozen part of every gateway request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub index: String,
    pub facets: Vec<String>,
    pub page_size: u32,
    pub sorts: Vec<SortStrategy>,
}

impl RequestTemplate {
    pub fn from_config(config: &LookoutConfig) -> Self {
        Self {
            index: config.gateway.index.clone(),
            facets: config.facets.clone(),
            page_size: config.search.page_size,
            sorts: config.sorts.clone(),
        }
    }

    pub fn resolve(&self, request: &SearchRequest) -> GatewayRequest {
        let strategy = self.sorts.iter().find(|s| s.key == request.sort);
        if strategy.is_none() {
            warn!(target: "lookout::dispatch", sort = %request.sort, "unknown sort strategy, using index order");
        }
        let filters = request
            .filters
            .iter()
            .filter(|(facet, _)| {
                let known = self.facets.contains(*facet);
                if !known {
                    warn!(target: "lookout::dispatch", %facet, "filter on unconfigured facet dropped");
                }
                known
            })
            .map(|(facet, values)| (facet.clone(), values.clone()))
            .collect();
        GatewayRequest {
            index: strategy.and_then(|s| s.index.clone()).unwrap_or_else(|| self.index.clone()),
            term: request.term.clone(),
            filters,
            sort: request.sort.clone(),
            sort_rules: strategy.map(|s| s.rules.clone()).unwrap_or_default(),
            facets: self.facets.clone(),
            page: request.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    policy: DispatchPolicy,
    debouncer: Debouncer,
    immediate: bool,
    last_issued: SeqNo,
    in_flight: BTreeSet<SeqNo>,
    template: RequestTemplate,
}

impl Dispatcher {
    pub fn new(policy: DispatchPolicy, template: RequestTemplate) -> Self {
        Self {
            policy,
            debouncer: Debouncer::new(policy.debounce),
            immediate: false,
            last_issued: SeqNo::ZERO,
            in_flight: BTreeSet::new(),
            template,
        }
    }

    pub fn from_config(config: &LookoutConfig) -> Self {
        Self::new(DispatchPolicy::from_config(config), RequestTemplate::from_config(config))
    }

    /// Record a state change. Never sends anything by itself; see `poll`.
    pub fn observe(&mut self, change: Change, now: Instant) {
        if change.is_term() || self.policy.debounce_all {
            let deadline = self.debouncer.arm(now);
            debug!(target: "lookout::dispatch", ?change, ?deadline, "debounce armed");
        } else {
            self.immediate = true;
            debug!(target: "lookout::dispatch", ?change, "immediate dispatch requested");
        }
    }

    /// Re-issue the current state on the next `poll`, e.g. for the initial page.
    pub fn refresh(&mut self) {
        self.immediate = true;
        debug!(target: "lookout::dispatch", "refresh requested");
    }

    /// Build the next request if one is due at `now`.
    pub fn poll(&mut self, now: Instant, state: &QueryState) -> Option<SearchRequest> {
        let due = self.immediate || self.debouncer.fire(now);
        if !due {
            return None;
        }
        self.immediate = false;
        self.debouncer.cancel();
        self.last_issued = self.last_issued.next();
        self.in_flight.insert(self.last_issued);
        let request = SearchRequest::snapshot(self.last_issued, state);
        info!(
            target: "lookout::dispatch",
            seq = %request.seq,
            term = %request.term,
            sort = %request.sort,
            page = request.page,
            in_flight = self.in_flight.len(),
            "dispatching search"
        );
        Some(request)
    }

    pub fn gateway_request(&self, request: &SearchRequest) -> GatewayRequest {
        self.template.resolve(request)
    }

    /// Convert a finished gateway call into an outcome for the reconciler.
    /// Failures become `Outcome::Failed`; nothing here returns `Err`.
    pub fn settle(&mut self, seq: SeqNo, result: Result<GatewayResponse, GatewayFailure>) -> Outcome {
        self.in_flight.remove(&seq);
        match result {
            Ok(response) => Outcome::Answered(SearchResponse::stamp(seq, response)),
            Err(failure) => {
                warn!(target: "lookout::dispatch", %seq, error = %failure, "search request failed");
                Outcome::Failed { seq, failure }
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn has_pending(&self) -> bool {
        self.immediate || self.debouncer.is_armed()
    }

    pub fn last_issued(&self) -> SeqNo {
        self.last_issued
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn newest_in_flight(&self) -> Option<SeqNo> {
        self.in_flight.last().copied()
    }
}
