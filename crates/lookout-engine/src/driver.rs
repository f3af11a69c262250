//! Async event loop for a `SearchSession`.
//!
//! One task owns the session and multiplexes three event sources: user
//! actions, the debounce deadline and in-flight gateway calls. Every event
//! is handled to completion before the next, so no component needs a lock.
//! In-flight calls are never cancelled; late answers go through the
//! reconciler like any other.

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use lookout_core::error::GatewayFailure;
use lookout_core::traits::SearchGateway;
use lookout_core::types::{GatewayResponse, SeqNo};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::{Action, SearchSession};

type InFlight = BoxFuture<'static, (SeqNo, Result<GatewayResponse, GatewayFailure>)>;

/// Sending side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    actions: mpsc::UnboundedSender<Action>,
}

impl SessionHandle {
    /// False once the session loop has stopped.
    pub fn send(&self, action: Action) -> bool {
        self.actions.send(action).is_ok()
    }
}

/// Run `session` on a new task. Dropping every handle ends the loop once
/// pending and in-flight work has settled; the task yields the session back.
pub fn spawn<G>(session: SearchSession, gateway: Arc<G>) -> (SessionHandle, JoinHandle<SearchSession>)
where
    G: SearchGateway + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, gateway, rx));
    (SessionHandle { actions: tx }, task)
}

pub async fn run<G>(mut session: SearchSession, gateway: Arc<G>, mut actions: mpsc::UnboundedReceiver<Action>) -> SearchSession
where
    G: SearchGateway + 'static,
{
    let mut in_flight: FuturesUnordered<InFlight> = FuturesUnordered::new();
    let mut closed = false;

    loop {
        while let Some(dispatch) = session.poll(now()) {
            let gateway = Arc::clone(&gateway);
            let seq = dispatch.request.seq;
            let request = dispatch.gateway;
            in_flight.push(
                async move {
                    let result = gateway.search(&request).await;
                    (seq, result)
                }
                .boxed(),
            );
        }

        if closed && in_flight.is_empty() && session.next_deadline().is_none() {
            debug!(target: "lookout::session", "action channel closed, session loop done");
            break;
        }

        let deadline = session.next_deadline();
        tokio::select! {
            action = actions.recv(), if !closed => match action {
                Some(action) => {
                    session.handle(action, now());
                }
                None => closed = true,
            },
            Some((seq, result)) = in_flight.next(), if !in_flight.is_empty() => {
                session.settle(seq, result);
            }
            () = wait_until(deadline) => {}
        }
    }
    session
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
