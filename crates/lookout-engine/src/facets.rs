//! Facet Presenter.

use std::collections::BTreeMap;

use lookout_core::types::{QueryState, SearchResponse};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOption {
    pub value: String,
    pub count: u64,
    pub selected: bool,
}

/// Optional narrowing of an option list (the searchable refinement box).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetQuery {
    /// Case-insensitive substring filter on option values.
    pub search: Option<String>,
    /// Cap on the number of unselected options shown.
    pub limit: Option<usize>,
}

/// Options for `facet`: selected first, then by count descending, then by value.
///
/// Selected values missing from the latest counts are emitted with count 0 so
/// they can still be deselected.
pub fn facet_options(
    facet: &str,
    result: Option<&SearchResponse>,
    state: &QueryState,
    query: &FacetQuery,
) -> Vec<FacetOption> {
    let mut merged: BTreeMap<&str, u64> = result
        .and_then(|r| r.facet_counts.get(facet))
        .map(|counts| counts.iter().map(|(v, c)| (v.as_str(), *c)).collect())
        .unwrap_or_default();
    if let Some(selected) = state.selected(facet) {
        for value in selected {
            merged.entry(value.as_str()).or_insert(0);
        }
    }

    let needle = query.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty());
    let mut options: Vec<FacetOption> = merged
        .into_iter()
        .map(|(value, count)| FacetOption { value: value.to_string(), count, selected: state.is_selected(facet, value) })
        .filter(|o| o.selected || needle.as_ref().map_or(true, |n| o.value.to_lowercase().contains(n.as_str())))
        .collect();
    options.sort_by(|a, b| b.selected.cmp(&a.selected).then(b.count.cmp(&a.count)).then_with(|| a.value.cmp(&b.value)));

    if let Some(limit) = query.limit {
        let selected = options.iter().filter(|o| o.selected).count();
        options.truncate(selected + limit);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::types::{FacetCounts, SeqNo, SortKey};

    fn result(counts: &[(&str, u64)]) -> SearchResponse {
        let mut facet_counts = FacetCounts::new();
        let entry = facet_counts.entry("country".into()).or_default();
        for (v, c) in counts {
            entry.insert((*v).to_string(), *c);
        }
        SearchResponse { seq: SeqNo(1), hits: vec![], facet_counts, total_hits: 0, page: 0 }
    }

    fn state_with(selected: &[&str]) -> QueryState {
        let mut s = QueryState::new(SortKey::from("relevance"));
        for v in selected {
            s.filters.entry("country".into()).or_default().insert((*v).to_string());
        }
        s
    }

    #[test]
    fn selected_value_without_count_is_kept_at_zero() {
        let r = result(&[("FR", 10), ("DE", 4)]);
        let options = facet_options("country", Some(&r), &state_with(&["XX"]), &FacetQuery::default());
        assert_eq!(options[0], FacetOption { value: "XX".into(), count: 0, selected: true });
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn ordering_is_selected_then_count_then_value() {
        let r = result(&[("AT", 4), ("DE", 4), ("FR", 10), ("IT", 1)]);
        let options = facet_options("country", Some(&r), &state_with(&["IT"]), &FacetQuery::default());
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["IT", "FR", "AT", "DE"]);
    }

    #[test]
    fn no_result_yet_shows_only_selections() {
        let options = facet_options("country", None, &state_with(&["FR"]), &FacetQuery::default());
        assert_eq!(options, vec![FacetOption { value: "FR".into(), count: 0, selected: true }]);
        assert!(facet_options("timezone", None, &state_with(&[]), &FacetQuery::default()).is_empty());
    }

    #[test]
    fn search_and_limit_never_hide_selections() {
        let r = result(&[("France", 10), ("Finland", 3), ("Germany", 7), ("Spain", 2)]);
        let query = FacetQuery { search: Some("FIN".into()), limit: Some(1) };
        let options = facet_options("country", Some(&r), &state_with(&["Spain"]), &query);
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["Spain", "Finland"]);
    }
}
