//! Response-time probe: fire N identical searches at once and summarize
//! their latency. A failed search counts as infinitely slow.

use std::fmt;
use std::time::{Duration, Instant};

use futures::future::join_all;
use lookout_core::traits::SearchGateway;
use lookout_core::types::GatewayRequest;
use tracing::info;

/// One entry per search; `None` is a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub latencies: Vec<Option<Duration>>,
}

impl ProbeReport {
    pub fn failures(&self) -> usize {
        self.latencies.iter().filter(|l| l.is_none()).count()
    }

    /// `None` when any search failed.
    pub fn average(&self) -> Option<Duration> {
        let total: Option<Duration> = self.latencies.iter().copied().sum();
        let count = u32::try_from(self.latencies.len()).ok().filter(|n| *n > 0)?;
        total.map(|t| t / count)
    }

    /// Fastest successful search.
    pub fn min(&self) -> Option<Duration> {
        self.latencies.iter().flatten().min().copied()
    }

    /// `None` when any search failed.
    pub fn max(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        self.latencies.iter().copied().collect::<Option<Vec<_>>>()?.into_iter().max()
    }
}

struct Latency(Option<Duration>);

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{:.3}s", d.as_secs_f64()),
            None => f.write_str("failed"),
        }
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Response times ({} queries, {} failed):", self.latencies.len(), self.failures())?;
        writeln!(f, "  avg: {}", Latency(self.average()))?;
        writeln!(f, "  min: {}", Latency(self.min()))?;
        write!(f, "  max: {}", Latency(self.max()))
    }
}

pub async fn probe<G>(gateway: &G, request: &GatewayRequest, parallel: usize) -> ProbeReport
where
    G: SearchGateway + ?Sized,
{
    let runs = (0..parallel).map(move |_| async move {
        let started = Instant::now();
        gateway.search(request).await.ok().map(|_| started.elapsed())
    });
    let report = ProbeReport { latencies: join_all(runs).await };
    info!(
        target: "lookout::meili",
        queries = parallel,
        failed = report.failures(),
        "probe finished"
    );
    report
}
