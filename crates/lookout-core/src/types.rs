//! Domain types exchanged between the store, dispatcher, reconciler and gateways.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::GatewayFailure;

pub type FacetName = String;
pub type FacetValue = String;

/// Selected values per facet. Values of one facet are OR-ed, facets are AND-ed.
pub type Filters = BTreeMap<FacetName, BTreeSet<FacetValue>>;

/// Per-facet value distribution reported by the index for the current query.
pub type FacetCounts = BTreeMap<FacetName, BTreeMap<FacetValue, u64>>;

/// The latest accepted response, shared read-only with the presenters.
pub type ResultSet = Arc<SearchResponse>;

/// Dispatch order of a request. Strictly increasing within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeqNo(pub u64);

impl SeqNo {
    pub const ZERO: SeqNo = SeqNo(0);

    #[must_use]
    pub fn next(self) -> Self {
        SeqNo(self.0 + 1)
    }
}

impl fmt::Display for SeqNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name of a configured sort strategy (e.g. `population_desc`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKey(String);

impl SortKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SortKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user's current search intent.
///
/// - `term`: free text, empty matches everything
/// - `filters`: selected facet values; a facet with no selection has no key
/// - `sort`: the single active sort strategy
/// - `page`: zero-based result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    pub term: String,
    pub filters: Filters,
    pub sort: SortKey,
    pub page: u32,
}

impl QueryState {
    pub fn new(sort: SortKey) -> Self {
        Self { term: String::new(), filters: Filters::new(), sort, page: 0 }
    }

    pub fn selected(&self, facet: &str) -> Option<&BTreeSet<FacetValue>> {
        self.filters.get(facet)
    }

    pub fn is_selected(&self, facet: &str, value: &str) -> bool {
        self.filters.get(facet).is_some_and(|values| values.contains(value))
    }
}

/// Immutable snapshot of a `QueryState` taken at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub seq: SeqNo,
    pub term: String,
    pub filters: Filters,
    pub sort: SortKey,
    pub page: u32,
}

impl SearchRequest {
    pub fn snapshot(seq: SeqNo, state: &QueryState) -> Self {
        Self {
            seq,
            term: state.term.clone(),
            filters: state.filters.clone(),
            sort: state.sort.clone(),
            page: state.page,
        }
    }
}

/// A search document. Only the primary key and display fields are ever read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Identifier under `primary_key`; numeric keys are rendered in decimal.
    pub fn id(&self, primary_key: &str) -> Option<String> {
        match self.0.get(primary_key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }
}

/// What the dispatcher hands to a gateway: the request with config resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub index: String,
    pub term: String,
    pub filters: Filters,
    pub sort: SortKey,
    pub sort_rules: Vec<String>,
    pub facets: Vec<FacetName>,
    pub page: u32,
    pub page_size: u32,
}

/// What a gateway returns. Carries no sequence number; the dispatcher stamps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub hits: Vec<Document>,
    pub facet_counts: FacetCounts,
    pub total_hits: u64,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub seq: SeqNo,
    pub hits: Vec<Document>,
    pub facet_counts: FacetCounts,
    pub total_hits: u64,
    pub page: u32,
}

impl SearchResponse {
    pub fn stamp(seq: SeqNo, response: GatewayResponse) -> Self {
        Self {
            seq,
            hits: response.hits,
            facet_counts: response.facet_counts,
            total_hits: response.total_hits,
            page: response.page,
        }
    }
}

/// Result of one dispatched request as seen by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answered(SearchResponse),
    Failed { seq: SeqNo, failure: GatewayFailure },
}

impl Outcome {
    pub fn seq(&self) -> SeqNo {
        match self {
            Outcome::Answered(response) => response.seq,
            Outcome::Failed { seq, .. } => *seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_accepts_numbers_and_strings() {
        let numeric = Document::from(json!({"geonameid": 2988507, "name": "Paris"}));
        assert_eq!(numeric.id("geonameid").as_deref(), Some("2988507"));
        let text = Document::from(json!({"slug": "paris"}));
        assert_eq!(text.id("slug").as_deref(), Some("paris"));
        assert_eq!(text.id("geonameid"), None);
    }

    #[test]
    fn snapshot_copies_the_state() {
        let mut state = QueryState::new(SortKey::from("relevance"));
        state.term = "par".into();
        state.filters.entry("country".into()).or_default().insert("France".into());
        state.page = 2;
        let request = SearchRequest::snapshot(SeqNo(7), &state);
        state.term.push('i');
        assert_eq!(request.seq, SeqNo(7));
        assert_eq!(request.term, "par");
        assert_eq!(request.page, 2);
        assert!(request.filters["country"].contains("France"));
    }
}
