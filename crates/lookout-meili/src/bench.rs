//! Indexing benchmark.
//!
//! Re-creates the index once per dataset fraction, indexes that prefix and
//! records document count, on-disk size and wall time. A straight line fitted
//! through (size, time) tells whether indexing cost grows linearly.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lookout_core::dataset::prefix_len;
use lookout_core::error::Result;
use serde::Serialize;
use serde_json::Value;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::admin::{MeiliAdmin, TaskWait};
use crate::probe::ProbeReport;

pub const STATS_FILE: &str = "indexing_stats.csv";
pub const TREND_FILE: &str = "trend_analysis.txt";
pub const RESOURCES_FILE: &str = "resource_monitoring.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchPlan {
    pub index: String,
    pub primary_key: String,
    pub percents: Vec<u32>,
    pub wait: TaskWait,
    /// Extra pause after an indexing task outlives `wait.timeout`.
    pub grace: Duration,
}

impl BenchPlan {
    pub fn new(index: impl Into<String>, primary_key: impl Into<String>, percents: Vec<u32>) -> Self {
        Self {
            index: index.into(),
            primary_key: primary_key.into(),
            percents,
            wait: TaskWait::default(),
            grace: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStat {
    pub fraction: f64,
    pub doc_count: u64,
    pub index_size_mb: f64,
    pub indexing_time_s: f64,
}

impl BatchStat {
    /// Seconds per megabyte; infinite for an empty index.
    pub fn time_per_size(&self) -> f64 {
        self.indexing_time_s / self.index_size_mb
    }
}

/// Least-squares line `indexing_time = slope * index_size + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
}

impl Trend {
    /// `None` with fewer than two batches or when every batch had the same size.
    pub fn fit(stats: &[BatchStat]) -> Option<Self> {
        if stats.len() < 2 {
            return None;
        }
        let n = stats.len() as f64;
        let mean_x = stats.iter().map(|s| s.index_size_mb).sum::<f64>() / n;
        let mean_y = stats.iter().map(|s| s.indexing_time_s).sum::<f64>() / n;
        let (mut sxx, mut sxy) = (0.0, 0.0);
        for s in stats {
            let dx = s.index_size_mb - mean_x;
            sxx += dx * dx;
            sxy += dx * (s.indexing_time_s - mean_y);
        }
        if sxx.abs() < f64::EPSILON {
            return None;
        }
        let slope = sxy / sxx;
        Some(Self { slope, intercept: mean_y - slope * mean_x })
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "indexing_time = {:.2} * index_size + {:.2}", self.slope, self.intercept)
    }
}

/// CPU and resident memory of this process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessUsage {
    pub cpu_percent: f32,
    pub ram_mb: f64,
}

/// Contents of the resource report. Latencies are `null` when no search succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub cpu_percent: Option<f32>,
    pub ram_mb: Option<f64>,
    pub avg_response_time_s: Option<f64>,
    pub min_response_time_s: Option<f64>,
    pub max_response_time_s: Option<f64>,
    pub failed_queries: usize,
}

impl ResourceReport {
    pub fn new(usage: Option<ProcessUsage>, latency: &ProbeReport) -> Self {
        let secs = |d: Option<Duration>| d.map(|d| d.as_secs_f64());
        Self {
            cpu_percent: usage.map(|u| u.cpu_percent),
            ram_mb: usage.map(|u| u.ram_mb),
            avg_response_time_s: secs(latency.average()),
            min_response_time_s: secs(latency.min()),
            max_response_time_s: secs(latency.max()),
            failed_queries: latency.failures(),
        }
    }
}

/// Index each fraction of `documents` into a freshly created index.
pub async fn run(admin: &MeiliAdmin, plan: &BenchPlan, documents: &[Value]) -> Result<Vec<BatchStat>> {
    info!(target: "lookout::bench", index = %plan.index, documents = documents.len(), batches = plan.percents.len(), "indexing benchmark started");
    let mut stats = Vec::with_capacity(plan.percents.len());
    for &percent in &plan.percents {
        let batch = &documents[..prefix_len(documents.len(), percent)];
        let stat = index_batch(admin, plan, batch, percent).await?;
        info!(
            target: "lookout::bench",
            percent,
            docs = stat.doc_count,
            size_mb = stat.index_size_mb,
            seconds = stat.indexing_time_s,
            "batch indexed"
        );
        stats.push(stat);
    }
    Ok(stats)
}

async fn index_batch(admin: &MeiliAdmin, plan: &BenchPlan, batch: &[Value], percent: u32) -> Result<BatchStat> {
    if let Some(deleted) = admin.delete_index(&plan.index).await? {
        admin.wait_for_task(deleted.task_uid, plan.wait).await?;
    }
    let created = admin.create_index(&plan.index, &plan.primary_key).await?;
    admin.wait_for_task(created.task_uid, plan.wait).await?;

    let started = Instant::now();
    let enqueued = admin.add_documents(&plan.index, batch).await?;
    if admin.wait_for_task(enqueued.task_uid, plan.wait).await?.is_none() {
        warn!(target: "lookout::bench", percent, uid = enqueued.task_uid, "indexing task timed out, it may still be processing");
        sleep(plan.grace).await;
    }
    let indexing_time_s = started.elapsed().as_secs_f64();

    let index_stats = admin.stats(&plan.index).await?;
    Ok(BatchStat {
        fraction: f64::from(percent) / 100.0,
        doc_count: index_stats.number_of_documents,
        index_size_mb: index_stats.size_mb(),
        indexing_time_s,
    })
}

/// CPU use over `window` plus current RSS. `None` if the process table
/// cannot be read.
pub async fn sample_process(window: Duration) -> Option<ProcessUsage> {
    let pid = sysinfo::get_current_pid().ok()?;
    let kind = ProcessRefreshKind::nothing().with_cpu().with_memory();
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
    sleep(window).await;
    system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
    let process = system.process(pid)?;
    Some(ProcessUsage { cpu_percent: process.cpu_usage(), ram_mb: process.memory() as f64 / 1024.0 / 1024.0 })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchFiles {
    pub stats: PathBuf,
    pub trend: PathBuf,
    pub resources: PathBuf,
}

pub fn trend_line(trend: Option<&Trend>) -> String {
    match trend {
        Some(trend) => format!("Trend: {trend}"),
        None => "Trend: undetermined, index size did not vary".to_string(),
    }
}

pub fn write_reports(out_dir: &Path, stats: &[BatchStat], resources: &ResourceReport) -> Result<BenchFiles> {
    fs::create_dir_all(out_dir)?;
    let files = BenchFiles {
        stats: out_dir.join(STATS_FILE),
        trend: out_dir.join(TREND_FILE),
        resources: out_dir.join(RESOURCES_FILE),
    };

    let mut csv = String::from("fraction,doc_count,index_size_mb,indexing_time_s,time_per_size\n");
    for s in stats {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            s.fraction,
            s.doc_count,
            s.index_size_mb,
            s.indexing_time_s,
            s.time_per_size()
        ));
    }
    fs::write(&files.stats, csv)?;
    fs::write(&files.trend, format!("{}\n", trend_line(Trend::fit(stats).as_ref())))?;
    fs::write(&files.resources, serde_json::to_string_pretty(resources)?)?;
    info!(target: "lookout::bench", dir = %out_dir.display(), "benchmark reports written");
    Ok(files)
}
