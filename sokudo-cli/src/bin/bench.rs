//! Benchmark sweep driver for sokudo-harness
//!
//! Runs the full benchmark pipeline (assembly, resolution with precision
//! fallback, warm-up, timed decoding, ranking, aggregation) against
//! built-in deterministic reference engines, so the harness is exercisable
//! end-to-end without any model artifacts. Real engine integrations plug
//! in through the `sokudo_harness::engine` traits instead.

use anyhow::{Context, Result};
use clap::Parser;
use half::f16;
use sokudo_harness::{
    BenchmarkCase, BenchmarkRunner, END_OF_SEQUENCE_ID, Environment, HarnessConfig, ReportSink,
    ScoreData, ScoreTensor, StatefulInfer, StatelessInfer, Tokenizer,
};
use std::path::PathBuf;
use tracing::warn;

/// Greedy-decoding latency benchmark over the built-in reference engines
#[derive(Parser)]
#[command(name = "sokudo-bench")]
struct Cli {
    /// Path to the benchmark corpus: a JSON list of {label, prompt}
    cases: PathBuf,

    /// Harness config TOML (active variants, sync timing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also time each run in the directly-blocking mode
    #[arg(long)]
    sync: bool,

    /// Pretend this engine artifact is unavailable (repeatable), e.g.
    /// --unavailable stateless-fp16, to exercise precision fallback
    #[arg(long = "unavailable", value_name = "VARIANT")]
    unavailable: Vec<String>,

    /// Show only the final aggregates
    #[arg(long)]
    quiet: bool,
}

const DEMO_VOCAB: usize = 512;

/// Token ids 0..16 are reserved (0 pad, 3 end-of-sequence); text tokens
/// start above them.
const TOKEN_OFFSET: u32 = 16;

/// One-character-per-token tokenizer for the reference engines.
struct DemoTokenizer;

impl Tokenizer for DemoTokenizer {
    fn encode(&self, text: &str) -> sokudo_harness::Result<Vec<u32>> {
        Ok(text
            .chars()
            .map(|c| (c as u32 + TOKEN_OFFSET) % DEMO_VOCAB as u32)
            .collect())
    }

    fn decode(&self, ids: &[u32]) -> sokudo_harness::Result<String> {
        Ok(ids
            .iter()
            .map(|&id| {
                id.checked_sub(TOKEN_OFFSET)
                    .and_then(char::from_u32)
                    .unwrap_or('?')
            })
            .collect())
    }
}

/// Deterministic next-token choice: FNV-style mix of the visible context.
/// Roughly one context in nine ends the generation.
fn demo_next_id(context_hash: u64) -> u32 {
    if context_hash % 9 == 0 {
        return END_OF_SEQUENCE_ID;
    }
    (context_hash % (DEMO_VOCAB as u64 - u64::from(TOKEN_OFFSET))) as u32 + TOKEN_OFFSET
}

fn mix(hash: u64, token: u32) -> u64 {
    (hash ^ u64::from(token)).wrapping_mul(0x0000_0100_0000_01b3)
}

fn hash_tokens(tokens: &[u32]) -> u64 {
    tokens.iter().fold(0xcbf2_9ce4_8422_2325, |h, &t| mix(h, t))
}

/// Scores peaking at `id` on the last time row.
fn demo_scores(id: u32, time: usize, half_precision: bool) -> sokudo_harness::Result<ScoreTensor> {
    let mut values = vec![0.0f32; time * DEMO_VOCAB];
    values[(time - 1) * DEMO_VOCAB + id as usize] = 1.0;
    let data = if half_precision {
        ScoreData::F16(values.into_iter().map(f16::from_f32).collect())
    } else {
        ScoreData::F32(values)
    };
    ScoreTensor::new(1, time, DEMO_VOCAB, data)
}

struct StatelessDemoFp32;

impl StatelessInfer for StatelessDemoFp32 {
    fn infer(&self, tokens: &[u32]) -> sokudo_harness::Result<ScoreTensor> {
        demo_scores(demo_next_id(hash_tokens(tokens)), tokens.len().max(1), false)
    }
}

struct StatelessDemoFp16;

impl StatelessInfer for StatelessDemoFp16 {
    fn infer(&self, tokens: &[u32]) -> sokudo_harness::Result<ScoreTensor> {
        demo_scores(demo_next_id(hash_tokens(tokens)), tokens.len().max(1), true)
    }
}

/// Running context hash standing in for a decoding cache.
struct DemoSession {
    hash: u64,
}

struct StatefulDemoFp32;

impl StatefulInfer for StatefulDemoFp32 {
    type Session = DemoSession;

    fn new_session(&self) -> sokudo_harness::Result<DemoSession> {
        Ok(DemoSession {
            hash: 0xcbf2_9ce4_8422_2325,
        })
    }

    fn infer(&self, tokens: &[u32], session: &mut DemoSession) -> sokudo_harness::Result<ScoreTensor> {
        for &token in tokens {
            session.hash = mix(session.hash, token);
        }
        demo_scores(demo_next_id(session.hash), 1, false)
    }
}

struct StatefulDemoFp16;

impl StatefulInfer for StatefulDemoFp16 {
    type Session = DemoSession;

    fn new_session(&self) -> sokudo_harness::Result<DemoSession> {
        Ok(DemoSession {
            hash: 0xcbf2_9ce4_8422_2325,
        })
    }

    fn infer(&self, tokens: &[u32], session: &mut DemoSession) -> sokudo_harness::Result<ScoreTensor> {
        for &token in tokens {
            session.hash = mix(session.hash, token);
        }
        demo_scores(demo_next_id(session.hash), 1, true)
    }
}

/// Ranking sink that prints each line as it is emitted.
struct StdoutSink {
    quiet: bool,
}

impl ReportSink for StdoutSink {
    fn line(&mut self, text: &str) {
        if !self.quiet {
            println!("{text}");
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load_from(path)?,
        None => HarnessConfig::default(),
    };
    if cli.sync {
        config.include_sync_timing = true;
    }

    let data = std::fs::read_to_string(&cli.cases)
        .with_context(|| format!("failed to read {}", cli.cases.display()))?;
    let cases: Vec<BenchmarkCase> =
        serde_json::from_str(&data).context("failed to parse benchmark cases")?;
    eprintln!("Loaded {} cases", cases.len());

    let unavailable = |name: &str| cli.unavailable.iter().any(|u| u == name);

    let env = Environment::assemble(
        &config,
        || Some(DemoTokenizer),
        || (!unavailable("stateless-fp32")).then_some(StatelessDemoFp32),
        || (!unavailable("stateless-fp16")).then_some(StatelessDemoFp16),
        || (!unavailable("stateful-fp32")).then_some(StatefulDemoFp32),
        || (!unavailable("stateful-fp16")).then_some(StatefulDemoFp16),
    )?;
    for variant in &env.failed {
        warn!("variant unavailable: {}", variant.debug_name());
    }

    let mut runner = BenchmarkRunner::new(
        &env,
        StdoutSink { quiet: cli.quiet },
        config.include_sync_timing,
    );
    runner.run(&cases);

    println!();
    println!("{}", "=".repeat(50));
    println!("Per-variant mean duration (ascending)");
    println!("{}", "=".repeat(50));
    for aggregate in runner.aggregates() {
        println!(
            "{:<24} {:.3} s mean over {} runs",
            aggregate.key,
            aggregate.mean().as_secs_f64(),
            aggregate.samples
        );
    }

    if runner.results().is_empty() && !cases.is_empty() {
        warn!("no variant produced any result");
    }

    Ok(())
}
