//! Request body for `POST /indexes/{index}/search`.

use lookout_core::types::{Filters, GatewayRequest};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody {
    pub q: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,
    pub facets: Vec<String>,
    /// One-based on the wire.
    pub page: u32,
    pub hits_per_page: u32,
}

impl SearchBody {
    pub fn from_request(request: &GatewayRequest) -> Self {
        Self {
            q: request.term.clone(),
            filter: filter_expression(&request.filters),
            sort: request.sort_rules.clone(),
            facets: request.facets.clone(),
            page: request.page.saturating_add(1),
            hits_per_page: request.page_size,
        }
    }
}

/// One facet-count query per refined facet: same term, every other facet's
/// filter, no hits. Its distribution replaces the main query's for that facet.
pub fn disjunctive_bodies(request: &GatewayRequest) -> Vec<(String, SearchBody)> {
    request
        .filters
        .iter()
        .filter(|(facet, values)| !values.is_empty() && request.facets.contains(*facet))
        .map(|(facet, _)| {
            let mut others = request.filters.clone();
            others.remove(facet);
            let body = SearchBody {
                q: request.term.clone(),
                filter: filter_expression(&others),
                sort: Vec::new(),
                facets: vec![facet.clone()],
                page: 1,
                hits_per_page: 0,
            };
            (facet.clone(), body)
        })
        .collect()
}

/// Outer array is AND-ed, each inner array OR-ed, one inner array per facet.
pub fn filter_expression(filters: &Filters) -> Vec<Vec<String>> {
    filters
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(facet, values)| values.iter().map(|value| format!("{facet} = \"{}\"", escape(value))).collect())
        .collect()
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
