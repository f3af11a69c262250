//! Response and error bodies returned by the index.

use lookout_core::error::GatewayFailure;
use lookout_core::types::{Document, FacetCounts, GatewayResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReply {
    #[serde(default)]
    pub hits: Vec<Document>,
    #[serde(default)]
    pub facet_distribution: FacetCounts,
    pub total_hits: Option<u64>,
    pub estimated_total_hits: Option<u64>,
    pub page: Option<u32>,
}

impl SearchReply {
    /// Exhaustive `totalHits` wins over `estimatedTotalHits`; the page goes
    /// back to zero-based, falling back to the page that was asked for.
    pub fn into_response(self, requested_page: u32) -> GatewayResponse {
        let total_hits = self.total_hits.or(self.estimated_total_hits).unwrap_or(self.hits.len() as u64);
        let page = self.page.map_or(requested_page, |page| page.saturating_sub(1));
        GatewayResponse { hits: self.hits, facet_counts: self.facet_distribution, total_hits, page }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Non-2xx answer. Uses the index's own message when the body parses.
pub fn rejection(status: u16, body: &str) -> GatewayFailure {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => GatewayFailure::Rejected { status, code: err.code, message: err.message },
        Err(_) => {
            let text = body.trim();
            let message = if text.is_empty() { format!("HTTP {status}") } else { text.to_string() };
            GatewayFailure::Rejected { status, code: None, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_maps_facets_and_totals() {
        let reply: SearchReply = serde_json::from_str(
            r#"{
                "hits": [{"geonameid": 2988507, "name": "Paris"}],
                "facetDistribution": {"country": {"France": 3}},
                "totalHits": 3,
                "page": 1,
                "hitsPerPage": 20
            }"#,
        )
        .unwrap();
        let response = reply.into_response(0);
        assert_eq!(response.total_hits, 3);
        assert_eq!(response.page, 0);
        assert_eq!(response.facet_counts["country"]["France"], 3);
        assert_eq!(response.hits[0].id("geonameid").as_deref(), Some("2988507"));
    }

    #[test]
    fn estimated_total_is_used_for_offset_pagination() {
        let reply: SearchReply =
            serde_json::from_str(r#"{"hits": [], "estimatedTotalHits": 1000, "offset": 0, "limit": 20}"#).unwrap();
        let response = reply.into_response(4);
        assert_eq!(response.total_hits, 1000);
        assert_eq!(response.page, 4);
        assert!(response.facet_counts.is_empty());
    }

    #[test]
    fn rejection_keeps_index_error_code() {
        let failure = rejection(
            400,
            r#"{"message":"Attribute `foo` is not filterable.","code":"invalid_search_filter","type":"invalid_request"}"#,
        );
        assert_eq!(
            failure,
            GatewayFailure::Rejected {
                status: 400,
                code: Some("invalid_search_filter".into()),
                message: "Attribute `foo` is not filterable.".into()
            }
        );
    }

    #[test]
    fn rejection_with_plain_body() {
        assert_eq!(
            rejection(502, "  "),
            GatewayFailure::Rejected { status: 502, code: None, message: "HTTP 502".into() }
        );
    }
}
