//! Session notifications forwarded to the terminal loop.

use std::sync::Arc;

use lookout_core::types::{QueryState, ResultSet};
use lookout_engine::reconciler::ErrorIndicator;
use lookout_engine::SearchSession;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

#[derive(Debug)]
pub enum Event {
    State(QueryState),
    Results(ResultSet),
    Failed(ErrorIndicator),
}

/// Route every listener of `session` into one channel.
pub fn forward(session: &mut SearchSession) -> mpsc::UnboundedReceiver<Event> {
    let (events_tx, events) = mpsc::unbounded_channel();
    let tx = events_tx.clone();
    session.subscribe_state(move |update| {
        let _ = tx.send(Event::State(update.state.clone()));
    });
    let tx = events_tx.clone();
    session.subscribe_results(move |result| {
        let _ = tx.send(Event::Results(Arc::clone(result)));
    });
    session.subscribe_errors(move |error| {
        let _ = events_tx.send(Event::Failed(error.clone()));
    });
    events
}

/// Wait for the session task, then hand `show` everything it published
/// while settling. The session is dropped first so the channel closes.
pub async fn settle<F>(
    task: JoinHandle<SearchSession>,
    mut events: mpsc::UnboundedReceiver<Event>,
    mut show: F,
) -> Result<(), JoinError>
where
    F: FnMut(Event),
{
    let session = task.await?;
    drop(session);
    while let Some(event) = events.recv().await {
        show(event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::future::BoxFuture;
    use lookout_core::config::LookoutConfig;
    use lookout_core::error::GatewayFailure;
    use lookout_core::traits::SearchGateway;
    use lookout_core::types::{Document, FacetCounts, GatewayRequest, GatewayResponse};
    use lookout_engine::{spawn, Action};
    use serde_json::json;

    struct SlowGateway;

    impl SearchGateway for SlowGateway {
        fn search<'a>(&'a self, request: &'a GatewayRequest) -> BoxFuture<'a, Result<GatewayResponse, GatewayFailure>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(GatewayResponse {
                    hits: vec![Document::from(json!({"geonameid": 1, "name": request.term}))],
                    facet_counts: FacetCounts::new(),
                    total_hits: 1,
                    page: 0,
                })
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn results_arriving_after_input_closes_are_still_shown() {
        let mut session = SearchSession::new(&LookoutConfig::default()).expect("valid");
        let events = forward(&mut session);
        let (handle, task) = spawn(session, Arc::new(SlowGateway));

        handle.send(Action::SetTerm("oslo".into()));
        // Input ends before the debounce even fires.
        drop(handle);

        let mut shown = Vec::new();
        settle(task, events, |event| {
            if let Event::Results(result) = event {
                shown.push(result.hits[0].field("name").cloned());
            }
        })
        .await
        .expect("session task");
        assert_eq!(shown, vec![Some(json!("oslo"))]);
    }
}
