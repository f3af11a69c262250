use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lookout_core::config::LookoutConfig;
use lookout_core::dataset::{load_documents, DatasetSplitter};
use lookout_core::types::{GatewayRequest, QueryState, SearchRequest, SeqNo, SortKey};
use lookout_engine::dispatcher::RequestTemplate;
use lookout_engine::hits::HitLayout;
use lookout_engine::{spawn, Action, SearchSession};
use lookout_meili::bench::{self, BenchPlan, ResourceReport, Trend};
use lookout_meili::{probe, MeiliAdmin, MeiliGateway};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use lookout_cli::args::{self, Command};
use lookout_cli::commands::{parse_line, unknown_facet, Input, HELP};
use lookout_cli::events::{self, Event};
use lookout_cli::render::{render_error, render_results};

#[tokio::main]
async fn main() -> Result<()> {
    lookout_cli::init_tracing();

    let argv: Vec<String> = env::args().collect();
    let program = argv.first().map_or("lookout-cli", String::as_str);
    let command = match args::parse(argv.get(1..).unwrap_or_default()) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n\n{}", args::usage(program));
            std::process::exit(2);
        }
    };

    match command {
        Command::Search => run_search().await,
        Command::Split { input, out_dir, step } => run_split(&input, &out_dir, step),
        Command::Probe { term, parallel } => run_probe(term, parallel).await,
        Command::Bench { input, out_dir, step, term, parallel } => run_bench(&input, &out_dir, step, term, parallel).await,
        Command::Help => {
            println!("{}", args::usage(program));
            Ok(())
        }
    }
}

fn load_config() -> Result<LookoutConfig> {
    LookoutConfig::load().context("failed to load lookout configuration")
}

async fn run_search() -> Result<()> {
    let config = load_config()?;
    let layout = HitLayout::from_config(&config);
    let gateway = Arc::new(MeiliGateway::new(&config.gateway)?);
    let mut session = SearchSession::new(&config)?;
    let mut state = session.state().clone();

    let mut notices = events::forward(&mut session);
    let (handle, task) = spawn(session, gateway);
    println!("lookout: searching {} at {}  (/h for help)", config.gateway.index, config.gateway.endpoint);
    // Show the unfiltered first page straight away.
    handle.send(Action::Refresh);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else { break };
                let input = match parse_line(&line) {
                    Ok(input) => input,
                    Err(message) => {
                        eprintln!("{message}");
                        continue;
                    }
                };
                if let Some(facet) = unknown_facet(&input, &config.facets) {
                    eprintln!("unknown facet {facet}; available: {}", config.facets.join(", "));
                    continue;
                }
                match input {
                    Input::Quit => break,
                    Input::Help => println!("{HELP}"),
                    Input::Action(Action::SetSort(key)) if config.sort(&key).is_none() => {
                        eprintln!("unknown sort {key}; available: {}", sort_keys(&config));
                    }
                    Input::Action(action) => {
                        if !handle.send(action) {
                            break;
                        }
                    }
                }
            }
            Some(event) = notices.recv() => show(event, &mut state, &config, &layout),
        }
    }

    debug!(target: "lookout::session", "input closed, settling in-flight searches");
    drop(handle);
    events::settle(task, notices, |event| show(event, &mut state, &config, &layout))
        .await
        .context("search session task failed")
}

fn show(event: Event, state: &mut QueryState, config: &LookoutConfig, layout: &HitLayout) {
    match event {
        Event::State(next) => *state = next,
        Event::Results(result) => print!("{}", render_results(&result, state, config, layout)),
        Event::Failed(error) => eprintln!("{}", render_error(&error)),
    }
}

fn sort_keys(config: &LookoutConfig) -> String {
    config.sorts.iter().map(|s| s.key.as_str()).collect::<Vec<_>>().join(", ")
}

fn run_split(input: &Path, out_dir: &Path, step: u32) -> Result<()> {
    let parts = DatasetSplitter::with_step(step)?
        .split_file(input, out_dir)
        .with_context(|| format!("failed to split {}", input.display()))?;
    for part in parts {
        println!("{:>3}%  {:>7} documents  {}", part.percent, part.documents, part.path.display());
    }
    Ok(())
}

fn probe_request(config: &LookoutConfig, term: String) -> GatewayRequest {
    let sort = config.default_sort().map_or_else(|| SortKey::from("relevance"), |s| s.key.clone());
    let mut state = QueryState::new(sort);
    state.term = term;
    RequestTemplate::from_config(config).resolve(&SearchRequest::snapshot(SeqNo(1), &state))
}

async fn run_probe(term: String, parallel: usize) -> Result<()> {
    let config = load_config()?;
    let gateway = MeiliGateway::new(&config.gateway)?;
    let request = probe_request(&config, term);

    println!("Probing {} with {parallel} parallel searches for \"{}\"", gateway.search_url(&request.index), request.term);
    let report = probe(&gateway, &request, parallel).await;
    println!("{report}");
    Ok(())
}

async fn run_bench(input: &Path, out_dir: &Path, step: u32, term: String, parallel: usize) -> Result<()> {
    let config = load_config()?;
    let documents = load_documents(input).with_context(|| format!("failed to read {}", input.display()))?;
    println!("Total documents: {}", documents.len());

    let admin = MeiliAdmin::new(&config.gateway)?;
    let plan = BenchPlan::new(&config.gateway.index, &config.gateway.primary_key, DatasetSplitter::with_step(step)?.percents());
    let stats = bench::run(&admin, &plan, &documents).await.context("indexing benchmark failed")?;
    for s in &stats {
        println!(
            "{:>4.0}%  docs: {}, size: {:.2} MB, time: {:.2} s",
            s.fraction * 100.0,
            s.doc_count,
            s.index_size_mb,
            s.indexing_time_s
        );
    }
    println!("{}", bench::trend_line(Trend::fit(&stats).as_ref()));

    println!("Monitoring resources...");
    let usage = bench::sample_process(Duration::from_secs(1)).await;
    let gateway = MeiliGateway::new(&config.gateway)?;
    let latency = probe(&gateway, &probe_request(&config, term), parallel).await;
    let files = bench::write_reports(out_dir, &stats, &ResourceReport::new(usage, &latency))?;

    match usage {
        Some(usage) => println!("CPU: {}%, RAM: {:.2} MB", usage.cpu_percent, usage.ram_mb),
        None => println!("CPU/RAM: unavailable"),
    }
    println!("{latency}");
    println!("Reports: {}, {}, {}", files.stats.display(), files.trend.display(), files.resources.display());
    Ok(())
}
