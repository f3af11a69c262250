//! reqwest-backed gateway.

use std::time::Instant;

use futures::future::{join_all, BoxFuture};
use lookout_core::config::GatewayConfig;
use lookout_core::error::{Error, GatewayFailure, Result};
use lookout_core::traits::SearchGateway;
use lookout_core::types::{GatewayRequest, GatewayResponse};
use tracing::{debug, warn};

use crate::query::{disjunctive_bodies, SearchBody};
use crate::wire::{rejection, SearchReply};

/// Talks to `POST {endpoint}/indexes/{index}/search`.
#[derive(Debug, Clone)]
pub struct MeiliGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    disjunctive_facets: bool,
}

impl MeiliGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &GatewayConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            disjunctive_facets: config.disjunctive_facets,
        }
    }

    pub fn search_url(&self, index: &str) -> String {
        format!("{}/indexes/{}/search", self.endpoint, index)
    }

    async fn execute(&self, request: &GatewayRequest) -> std::result::Result<GatewayResponse, GatewayFailure> {
        let started = Instant::now();
        let body = SearchBody::from_request(request);
        let refined = if self.disjunctive_facets { disjunctive_bodies(request) } else { Vec::new() };
        let (main, counts) = futures::join!(
            self.post(&request.index, &body),
            join_all(refined.iter().map(|(_, body)| self.post(&request.index, body)))
        );

        let mut response = main?.into_response(request.page);
        for ((facet, _), reply) in refined.iter().zip(counts) {
            if let Some(values) = reply?.facet_distribution.remove(facet) {
                response.facet_counts.insert(facet.clone(), values);
            }
        }
        debug!(
            target: "lookout::meili",
            index = %request.index,
            hits = response.hits.len(),
            total = response.total_hits,
            facet_queries = refined.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search answered"
        );
        Ok(response)
    }

    async fn post(&self, index: &str, body: &SearchBody) -> std::result::Result<SearchReply, GatewayFailure> {
        let mut builder = self.client.post(self.search_url(index)).json(body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| classify(&e))?;
        if !status.is_success() {
            return Err(rejection(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| GatewayFailure::Decode(e.to_string()))
    }
}

impl SearchGateway for MeiliGateway {
    fn search<'a>(
        &'a self,
        request: &'a GatewayRequest,
    ) -> BoxFuture<'a, std::result::Result<GatewayResponse, GatewayFailure>> {
        Box::pin(async move {
            let result = self.execute(request).await;
            if let Err(failure) = &result {
                warn!(target: "lookout::meili", index = %request.index, error = %failure, "search failed");
            }
            result
        })
    }
}

/// Transport problems surface as `Unreachable`; a 2xx body that reqwest
/// could not decode is `Decode`.
pub(crate) fn classify(err: &reqwest::Error) -> GatewayFailure {
    if err.is_decode() {
        return GatewayFailure::Decode(err.to_string());
    }
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    GatewayFailure::Unreachable(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_ignores_trailing_slash() {
        let config = GatewayConfig { endpoint: "http://search.local:7700/".into(), ..GatewayConfig::default() };
        let gateway = MeiliGateway::new(&config).unwrap();
        assert_eq!(gateway.search_url("cities"), "http://search.local:7700/indexes/cities/search");
    }
}
