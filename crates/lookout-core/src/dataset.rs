//! Dataset splitter for index load testing.
//!
//! Takes a JSON array of documents and writes cumulative prefixes of it
//! (10%, 20%, ... 100% by default) next to each other, so indexing cost can
//! be measured against dataset size.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    pub percent: u32,
    pub documents: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub step_percent: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { step_percent: 10 }
    }
}

#[derive(Default)]
pub struct DatasetSplitter {
    config: SplitConfig,
}

impl DatasetSplitter {
    pub fn new() -> Self { Self::default() }

    pub fn with_step(step_percent: u32) -> Result<Self> {
        if step_percent == 0 || step_percent > 100 {
            return Err(Error::InvalidConfig(format!("split step must be within 1..=100, got {step_percent}")));
        }
        Ok(Self { config: SplitConfig { step_percent } })
    }

    /// Percentages produced, always ending with 100.
    pub fn percents(&self) -> Vec<u32> {
        let step = self.config.step_percent.max(1);
        let mut out: Vec<u32> = (1..).map(|i| i * step).take_while(|p| *p < 100).collect();
        out.push(100);
        out
    }

    /// Split `input` into `<out_dir>/<stem>_<pct>.json` files.
    pub fn split_file(&self, input: &Path, out_dir: &Path) -> Result<Vec<SplitPart>> {
        let documents = load_documents(input)?;
        let stem = input.file_stem().map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().to_string());
        fs::create_dir_all(out_dir)?;

        let mut parts = Vec::new();
        for percent in self.percents() {
            let count = prefix_len(documents.len(), percent);
            let path = out_dir.join(format!("{stem}_{percent}.json"));
            let body = serde_json::to_string_pretty(&documents[..count])?;
            fs::write(&path, body)?;
            tracing::info!(target: "lookout::dataset", percent, documents = count, path = %path.display(), "wrote dataset slice");
            parts.push(SplitPart { percent, documents: count, path });
        }
        Ok(parts)
    }
}

/// Read a JSON array of documents.
pub fn load_documents(input: &Path) -> Result<Vec<Value>> {
    let raw = fs::read_to_string(input)?;
    match serde_json::from_str::<Value>(&raw)? {
        Value::Array(items) => Ok(items),
        _ => Err(Error::InvalidConfig(format!("{} does not contain a JSON array", input.display()))),
    }
}

/// Floor of `len * percent / 100`, computed without floating point.
pub fn prefix_len(len: usize, percent: u32) -> usize {
    let percent = usize::try_from(percent.min(100)).unwrap_or(100);
    len * percent / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_len_floors() {
        assert_eq!(prefix_len(10, 30), 3);
        assert_eq!(prefix_len(7, 10), 0);
        assert_eq!(prefix_len(7, 50), 3);
        assert_eq!(prefix_len(7, 100), 7);
    }

    #[test]
    fn percents_end_at_hundred() {
        assert_eq!(DatasetSplitter::new().percents(), vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert_eq!(DatasetSplitter::with_step(30).expect("step").percents(), vec![30, 60, 90, 100]);
        assert!(DatasetSplitter::with_step(0).is_err());
    }
}
