//! Command-line arguments.

use std::path::PathBuf;

use lookout_core::config::expand_path;

pub const DEFAULT_PARALLEL: usize = 5;
pub const DEFAULT_STEP: u32 = 10;
/// Search term used to time response latency.
pub const DEFAULT_TERM: &str = "Warsaw";
pub const DEFAULT_BENCH_DIR: &str = "output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search,
    Split { input: PathBuf, out_dir: PathBuf, step: u32 },
    Probe { term: String, parallel: usize },
    Bench { input: PathBuf, out_dir: PathBuf, step: u32, term: String, parallel: usize },
    Help,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\n  \
         {program} [search]\n      \
         interactive search\n  \
         {program} split <file> [--out-dir DIR] [--step N]\n      \
         write cumulative N%..100% slices of a JSON array (default step {DEFAULT_STEP})\n  \
         {program} probe [term] [--parallel N]\n      \
         time N concurrent searches (default {DEFAULT_PARALLEL}, term {DEFAULT_TERM})\n  \
         {program} bench <file> [--out-dir DIR] [--step N] [--term T] [--parallel N]\n      \
         index growing slices, fit time against size, report to DIR (default {DEFAULT_BENCH_DIR})\n\n\
         Configuration: lookout.toml, lookout.<RUST_ENV>.toml, LOOKOUT_* env vars"
    )
}

/// Parse everything after the program name.
pub fn parse(args: &[String]) -> Result<Command, String> {
    let Some((sub, rest)) = args.split_first() else {
        return Ok(Command::Search);
    };
    match sub.as_str() {
        "search" if rest.is_empty() => Ok(Command::Search),
        "search" => Err(format!("unexpected argument: {}", rest[0])),
        "split" => parse_split(rest),
        "probe" => parse_probe(rest),
        "bench" => parse_bench(rest),
        "-h" | "--help" | "help" => Ok(Command::Help),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_split(args: &[String]) -> Result<Command, String> {
    let mut input = None;
    let mut out_dir = None;
    let mut step = DEFAULT_STEP;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out-dir" | "-o" => out_dir = Some(expand_path(iter.next().ok_or("--out-dir needs a value")?)),
            "--step" => step = step_value(iter.next())?,
            flag if flag.starts_with('-') => return Err(format!("unknown flag: {flag}")),
            path if input.is_none() => input = Some(expand_path(path)),
            extra => return Err(format!("unexpected argument: {extra}")),
        }
    }
    let input: PathBuf = input.ok_or("split needs an input file")?;
    let out_dir = out_dir
        .or_else(|| input.parent().filter(|p| !p.as_os_str().is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(Command::Split { input, out_dir, step })
}

fn parse_bench(args: &[String]) -> Result<Command, String> {
    let mut input = None;
    let mut out_dir = PathBuf::from(DEFAULT_BENCH_DIR);
    let mut step = DEFAULT_STEP;
    let mut term = DEFAULT_TERM.to_string();
    let mut parallel = DEFAULT_PARALLEL;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out-dir" | "-o" => out_dir = expand_path(iter.next().ok_or("--out-dir needs a value")?),
            "--step" => step = step_value(iter.next())?,
            "--term" => term.clone_from(iter.next().ok_or("--term needs a value")?),
            "--parallel" | "-n" => parallel = parallel_value(iter.next())?,
            flag if flag.starts_with('-') => return Err(format!("unknown flag: {flag}")),
            path if input.is_none() => input = Some(expand_path(path)),
            extra => return Err(format!("unexpected argument: {extra}")),
        }
    }
    let input = input.ok_or("bench needs a dataset file")?;
    Ok(Command::Bench { input, out_dir, step, term, parallel })
}

fn step_value(value: Option<&String>) -> Result<u32, String> {
    let value = value.ok_or("--step needs a value")?;
    value
        .parse()
        .ok()
        .filter(|n| (1..=100).contains(n))
        .ok_or_else(|| format!("--step expects a percentage within 1..=100, got {value}"))
}

fn parallel_value(value: Option<&String>) -> Result<usize, String> {
    let value = value.ok_or("--parallel needs a value")?;
    value
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("--parallel expects a positive number, got {value}"))
}

fn parse_probe(args: &[String]) -> Result<Command, String> {
    let mut term = None;
    let mut parallel = DEFAULT_PARALLEL;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--parallel" | "-n" => parallel = parallel_value(iter.next())?,
            flag if flag.starts_with('-') => return Err(format!("unknown flag: {flag}")),
            text if term.is_none() => term = Some(text.to_string()),
            extra => return Err(format!("unexpected argument: {extra}")),
        }
    }
    Ok(Command::Probe { term: term.unwrap_or_else(|| DEFAULT_TERM.to_string()), parallel })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn no_arguments_means_interactive_search() {
        assert_eq!(parse(&[]), Ok(Command::Search));
        assert_eq!(parse(&args(&["search"])), Ok(Command::Search));
    }

    #[test]
    fn split_defaults_out_dir_to_input_directory() {
        assert_eq!(
            parse(&args(&["split", "data/cities.json"])),
            Ok(Command::Split { input: "data/cities.json".into(), out_dir: "data".into(), step: DEFAULT_STEP })
        );
        assert_eq!(
            parse(&args(&["split", "cities.json", "--out-dir", "slices", "--step", "25"])),
            Ok(Command::Split { input: "cities.json".into(), out_dir: "slices".into(), step: 25 })
        );
        assert!(parse(&args(&["split"])).is_err());
        assert!(parse(&args(&["split", "cities.json", "--step", "0"])).is_err());
        assert!(parse(&args(&["split", "cities.json", "--step", "101"])).is_err());
    }

    #[test]
    fn probe_parallelism() {
        assert_eq!(
            parse(&args(&["probe"])),
            Ok(Command::Probe { term: "Warsaw".into(), parallel: DEFAULT_PARALLEL })
        );
        assert_eq!(
            parse(&args(&["probe", "tokyo", "--parallel", "12"])),
            Ok(Command::Probe { term: "tokyo".into(), parallel: 12 })
        );
        assert!(parse(&args(&["probe", "-n", "0"])).is_err());
        assert!(parse(&args(&["probe", "--frobnicate"])).is_err());
    }

    #[test]
    fn bench_defaults_and_flags() {
        assert_eq!(
            parse(&args(&["bench", "world-cities.json"])),
            Ok(Command::Bench {
                input: "world-cities.json".into(),
                out_dir: "output".into(),
                step: 10,
                term: "Warsaw".into(),
                parallel: 5,
            })
        );
        assert_eq!(
            parse(&args(&["bench", "c.json", "-o", "out", "--step", "50", "--term", "Oslo", "-n", "2"])),
            Ok(Command::Bench { input: "c.json".into(), out_dir: "out".into(), step: 50, term: "Oslo".into(), parallel: 2 })
        );
        assert!(parse(&args(&["bench"])).is_err());
        assert!(parse(&args(&["bench", "c.json", "--term"])).is_err());
    }
}
