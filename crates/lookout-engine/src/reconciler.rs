//! Result Reconciler: the monotonic acceptance guard.
//!
//! A response is accepted iff its sequence number is not older than the last
//! accepted one. Nothing else is consulted, so the transport may reorder,
//! duplicate or never deliver responses without affecting correctness.

use std::sync::Arc;

use lookout_core::error::GatewayFailure;
use lookout_core::types::{Outcome, ResultSet, SearchResponse, SeqNo};
use tracing::{debug, info, warn};

use crate::observable::{Listeners, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Published as the new result set.
    Accepted,
    /// A current request failed; the result set is untouched.
    Failed,
    /// Superseded by an already accepted response and dropped.
    Stale { last_accepted: SeqNo },
    /// A failure of a request that a newer dispatch already replaced. Not
    /// surfaced; the newer request decides what is shown.
    Superseded { newest: SeqNo },
}

/// Transient error shown next to the still-displayed results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorIndicator {
    pub seq: SeqNo,
    pub failure: GatewayFailure,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    last_accepted: Option<SeqNo>,
    newest_issued: SeqNo,
    current: Option<ResultSet>,
    error: Option<ErrorIndicator>,
    listeners: Listeners<ResultSet>,
    error_listeners: Listeners<ErrorIndicator>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, response: SearchResponse) -> Verdict {
        if let Some(verdict) = self.stale(response.seq) {
            debug!(target: "lookout::reconcile", seq = %response.seq, "discarding stale response");
            return verdict;
        }
        info!(target: "lookout::reconcile", seq = %response.seq, hits = response.hits.len(), total = response.total_hits, "result set published");
        let result: ResultSet = Arc::new(response);
        self.last_accepted = Some(result.seq);
        self.current = Some(Arc::clone(&result));
        self.error = None;
        self.listeners.notify(&result);
        Verdict::Accepted
    }

    /// Note that `seq` was dispatched, so failures of older requests can be
    /// told apart from failures of the newest one.
    pub fn issued(&mut self, seq: SeqNo) {
        self.newest_issued = self.newest_issued.max(seq);
    }

    /// Record a failed request. The current result set is never touched.
    pub fn fail(&mut self, seq: SeqNo, failure: GatewayFailure) -> Verdict {
        if let Some(verdict) = self.stale(seq) {
            debug!(target: "lookout::reconcile", %seq, "ignoring failure of stale request");
            return verdict;
        }
        if seq < self.newest_issued {
            debug!(target: "lookout::reconcile", %seq, newest = %self.newest_issued, error = %failure, "ignoring failure of superseded request");
            return Verdict::Superseded { newest: self.newest_issued };
        }
        warn!(target: "lookout::reconcile", %seq, error = %failure, "keeping previous results after failure");
        let indicator = ErrorIndicator { seq, failure };
        self.error_listeners.notify(&indicator);
        self.error = Some(indicator);
        Verdict::Failed
    }

    pub fn handle(&mut self, outcome: Outcome) -> Verdict {
        match outcome {
            Outcome::Answered(response) => self.accept(response),
            Outcome::Failed { seq, failure } => self.fail(seq, failure),
        }
    }

    fn stale(&self, seq: SeqNo) -> Option<Verdict> {
        match self.last_accepted {
            Some(last) if seq < last => Some(Verdict::Stale { last_accepted: last }),
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&ResultSet> {
        self.current.as_ref()
    }

    pub fn last_accepted(&self) -> Option<SeqNo> {
        self.last_accepted
    }

    pub fn error(&self) -> Option<&ErrorIndicator> {
        self.error.as_ref()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ResultSet) + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn subscribe_errors<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ErrorIndicator) + Send + 'static,
    {
        self.error_listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id) || self.error_listeners.unsubscribe(id)
    }
}
