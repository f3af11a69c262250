//! Plain-text rendering of published results.

use std::fmt::Write as _;

use lookout_core::config::LookoutConfig;
use lookout_core::types::{QueryState, SearchResponse};
use lookout_engine::facets::{facet_options, FacetQuery};
use lookout_engine::hits::{hit_cards, HitLayout};
use lookout_engine::reconciler::ErrorIndicator;

/// Facet values shown per facet.
pub const FACET_LIMIT: usize = 8;

pub fn render_results(result: &SearchResponse, state: &QueryState, config: &LookoutConfig, layout: &HitLayout) -> String {
    let mut out = String::new();
    // The state may already hold a newer, still-debouncing term, so the
    // header names the search by its sequence number only.
    let _ = writeln!(out, "{} hits  (page {}, search {})", result.total_hits, result.page + 1, result.seq);

    let query = FacetQuery { search: None, limit: Some(FACET_LIMIT) };
    for facet in &config.facets {
        let options = facet_options(facet, Some(result), state, &query);
        if options.is_empty() {
            continue;
        }
        let _ = write!(out, "  {facet}:");
        for option in options {
            let mark = if option.selected { "x" } else { " " };
            let _ = write!(out, " [{mark}] {} ({})", option.value, option.count);
        }
        out.push('\n');
    }

    let cards = hit_cards(Some(result), layout);
    if cards.is_empty() {
        out.push_str("  no results\n");
    }
    for (i, card) in cards.iter().enumerate() {
        let rank = (result.page as usize) * (config.search.page_size as usize) + i + 1;
        let _ = write!(out, "{rank:>4}. {}", card.title);
        if let Some(id) = &card.id {
            let _ = write!(out, "  #{id}");
        }
        out.push('\n');
        if !card.details.is_empty() {
            let details: Vec<String> = card.details.iter().map(|d| format!("{}: {}", d.field, d.value)).collect();
            let _ = writeln!(out, "      {}", details.join(" | "));
        }
    }
    out
}

pub fn render_error(error: &ErrorIndicator) -> String {
    let hint = if error.failure.is_unreachable() { " (showing previous results)" } else { "" };
    format!("search {} failed: {}{hint}", error.seq, error.failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::error::GatewayFailure;
    use lookout_core::types::{Document, FacetCounts, SeqNo, SortKey};
    use serde_json::json;

    #[test]
    fn renders_facets_and_cards() {
        let config = LookoutConfig::default();
        let layout = HitLayout::from_config(&config);
        let mut state = QueryState::new(SortKey::from("population_desc"));
        state.term = "tok".into();
        state.filters.entry("country".into()).or_default().insert("Japan".into());

        let mut facet_counts = FacetCounts::new();
        facet_counts.entry("country".into()).or_default().insert("Japan".into(), 4);
        facet_counts.entry("country".into()).or_default().insert("Canada".into(), 1);
        let result = SearchResponse {
            seq: SeqNo(3),
            hits: vec![Document::from(json!({
                "geonameid": 1850147, "name": "Tokyo", "country": "Japan",
                "population": 8336599, "timezone": "Asia/Tokyo"
            }))],
            facet_counts,
            total_hits: 4,
            page: 0,
        };

        let text = render_results(&result, &state, &config, &layout);
        assert!(text.starts_with("4 hits  (page 1, search #3)\n"), "{text}");
        assert!(text.contains("country: [x] Japan (4) [ ] Canada (1)"), "{text}");
        assert!(text.contains("   1. Tokyo  #1850147"), "{text}");
        assert!(text.contains("population: 8,336,599"), "{text}");
        assert!(!text.contains("tok"), "a newer term must not label older hits: {text}");
    }

    #[test]
    fn unreachable_error_mentions_stale_results() {
        let error = ErrorIndicator { seq: SeqNo(7), failure: GatewayFailure::Unreachable("connection refused".into()) };
        assert_eq!(
            render_error(&error),
            "search #7 failed: gateway unreachable: connection refused (showing previous results)"
        );
    }
}
