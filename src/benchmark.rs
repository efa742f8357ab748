//! Batch resolution driver
//!
//! Reads JSON Lines records carrying an `instruction`, resolves each one with
//! bounded concurrency and appends the record plus a `prediction` field to a
//! shared sink. Records are written in completion order.

use crate::protocol::{Context, UserMessage};
use crate::result::ResultExt;
use crate::routing::AgentRoutingSpecsResolver;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const INSTRUCTION_FIELD: &str = "instruction";
pub const PREDICTION_FIELD: &str = "prediction";
pub const ERROR_FIELD: &str = "error";
pub const NO_AGENT_FOUND: &str = "No agent found";

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record on line {line} has no string 'instruction' field")]
    MissingInstruction { line: usize },

    #[error("Failed to write results: {0}")]
    Write(#[from] std::io::Error),

    #[error("Benchmark worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkOptions {
    /// Maximum number of records to resolve; `None` means all
    pub samples: Option<usize>,
    /// Maximum resolutions in flight
    pub concurrency: usize,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            samples: None,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BenchmarkSummary {
    pub processed: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub failed: usize,
}

enum Outcome {
    Matched,
    Unmatched,
    Failed,
}

/// Parse JSON Lines input; blank lines are skipped and field order is kept
pub fn parse_records(input: &str) -> Result<Vec<Map<String, Value>>, BenchmarkError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let line_number = index + 1;
            let record: Map<String, Value> = serde_json::from_str(line).map_err(|source| {
                BenchmarkError::Parse {
                    line: line_number,
                    source,
                }
            })?;
            if !matches!(record.get(INSTRUCTION_FIELD), Some(Value::String(_))) {
                return Err(BenchmarkError::MissingInstruction { line: line_number });
            }
            Ok(record)
        })
        .collect()
}

async fn annotate(
    resolver: &dyn AgentRoutingSpecsResolver,
    mut record: Map<String, Value>,
) -> (Map<String, Value>, Outcome) {
    let instruction = record
        .get(INSTRUCTION_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let result = resolver
        .resolve(&Context::empty(), &UserMessage::new(instruction))
        .await
        .on_failure(|e| warn!("Resolution failed: {}", e.sanitized_message()));

    let error = result.as_ref().err().map(|e| e.sanitized_message());
    let (prediction, outcome) = match result.get_or_none() {
        Some(Some(spec)) => (spec.name, Outcome::Matched),
        Some(None) => (NO_AGENT_FOUND.to_string(), Outcome::Unmatched),
        None => (NO_AGENT_FOUND.to_string(), Outcome::Failed),
    };

    record.insert(PREDICTION_FIELD.to_string(), Value::String(prediction));
    if let Some(error) = error {
        record.insert(ERROR_FIELD.to_string(), Value::String(error));
    }
    (record, outcome)
}

/// Resolve `records` and append each annotated record as one JSON line to `sink`
pub async fn run_benchmark<W>(
    resolver: Arc<dyn AgentRoutingSpecsResolver>,
    records: Vec<Map<String, Value>>,
    options: BenchmarkOptions,
    sink: Arc<Mutex<W>>,
) -> Result<BenchmarkSummary, BenchmarkError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut join_set = JoinSet::new();
    let limit = options.samples.unwrap_or(records.len());

    for record in records.into_iter().take(limit) {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| BenchmarkError::Worker(e.to_string()))?;
        let resolver = resolver.clone();
        let sink = sink.clone();

        join_set.spawn(async move {
            let (record, outcome) = annotate(resolver.as_ref(), record).await;
            drop(permit);

            let mut line = serde_json::to_vec(&record)
                .map_err(|e| BenchmarkError::Worker(e.to_string()))?;
            line.push(b'\n');

            let mut writer = sink.lock().await;
            writer.write_all(&line).await?;
            Ok::<_, BenchmarkError>(outcome)
        });
    }

    let mut summary = BenchmarkSummary::default();
    while let Some(joined) = join_set.join_next().await {
        let outcome = joined.map_err(|e| BenchmarkError::Worker(e.to_string()))??;
        summary.processed += 1;
        match outcome {
            Outcome::Matched => summary.matched += 1,
            Outcome::Unmatched => summary.unmatched += 1,
            Outcome::Failed => summary.failed += 1,
        }
        debug!(processed = summary.processed, "Benchmark progress");
    }

    sink.lock().await.flush().await?;
    Ok(summary)
}

/// File-to-file wrapper around [`run_benchmark`]
pub async fn run_benchmark_file(
    resolver: Arc<dyn AgentRoutingSpecsResolver>,
    input: &Path,
    output: &Path,
    options: BenchmarkOptions,
) -> Result<BenchmarkSummary, BenchmarkError> {
    let content = tokio::fs::read_to_string(input)
        .await
        .map_err(|source| BenchmarkError::Read {
            path: input.to_path_buf(),
            source,
        })?;
    let records = parse_records(&content)?;
    info!(records = records.len(), input = %input.display(), "Starting benchmark");

    let file = tokio::fs::File::create(output).await?;
    let summary = run_benchmark(resolver, records, options, Arc::new(Mutex::new(file))).await?;

    info!(
        processed = summary.processed,
        matched = summary.matched,
        unmatched = summary.unmatched,
        failed = summary.failed,
        output = %output.display(),
        "Benchmark complete"
    );
    Ok(summary)
}
