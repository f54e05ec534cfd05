//! Benchmark execution and aggregation
//!
//! Runs every active variant against every prompt case, strictly one run
//! at a time in variant declaration order so timing stays uncontended,
//! then emits a per-case ranking (fastest first) and keeps a running mean
//! per variant across all cases.
//!
//! The ranking stream goes through an injected [`ReportSink`] rather than
//! any global logging state; diagnostics use `tracing` like the rest of
//! the crate.

use crate::decode::{StatefulDecoder, StatelessDecoder};
use crate::engine::{StatefulInfer, StatelessInfer, Tiered, Tokenizer};
use crate::env::Environment;
use crate::variant::Variant;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Label suffix of runs timed in the directly-blocking mode.
pub const SYNC_SUFFIX: &str = " sync";

/// One labelled prompt of the benchmark corpus.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkCase {
    pub label: String,
    pub prompt: String,
}

/// One completed (variant, prompt) run. Immutable once recorded.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// Variant display name, optional mode suffix, then the case label.
    pub label: String,
    /// Label of the case this run belongs to, on its own so rankings
    /// never have to parse it back out of the composite label.
    pub case: String,
    pub duration: Duration,
    pub input: String,
    pub output: String,
}

/// Running duration statistics for one variant key across all cases.
#[derive(Debug, Clone)]
pub struct VariantAggregate {
    pub key: String,
    pub total: Duration,
    pub samples: usize,
}

impl VariantAggregate {
    pub fn mean(&self) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }
        self.total / self.samples as u32
    }
}

/// Line-oriented destination for ranking reports.
pub trait ReportSink {
    fn line(&mut self, text: &str);
}

impl ReportSink for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

/// Drives decoding runs for all active variants of an environment.
pub struct BenchmarkRunner<'e, T, SF, SH, KF, KH, S> {
    env: &'e Environment<T, SF, SH, KF, KH>,
    sink: S,
    include_sync_timing: bool,
    results: Vec<BenchmarkResult>,
    aggregates: Vec<VariantAggregate>,
}

impl<'e, T, SF, SH, KF, KH, S> BenchmarkRunner<'e, T, SF, SH, KF, KH, S>
where
    T: Tokenizer + Sync,
    SF: StatelessInfer + Sync,
    SH: StatelessInfer + Sync,
    KF: StatefulInfer + Sync,
    KH: StatefulInfer + Sync,
    KF::Session: Send,
    KH::Session: Send,
    S: ReportSink,
{
    pub fn new(env: &'e Environment<T, SF, SH, KF, KH>, sink: S, include_sync_timing: bool) -> Self {
        Self {
            env,
            sink,
            include_sync_timing,
            results: Vec::new(),
            aggregates: Vec::new(),
        }
    }

    /// Run every case against every active variant, in corpus order and
    /// variant declaration order.
    pub fn run(&mut self, cases: &[BenchmarkCase]) {
        for case in cases {
            self.run_case(case);
        }
    }

    fn run_case(&mut self, case: &BenchmarkCase) {
        if self.env.active().is_empty() {
            warn!("no active variants, skipping case '{}'", case.label);
            return;
        }

        let first = self.results.len();
        let env = self.env;
        for variant in Variant::ALL {
            match variant {
                Variant::StatelessFp32 => {
                    if let Some(engine) = &env.stateless_fp32 {
                        self.run_stateless(variant, engine, case);
                    }
                }
                Variant::StatelessFp16 => {
                    if let Some(engine) = &env.stateless_fp16 {
                        self.run_stateless(variant, engine, case);
                    }
                }
                Variant::StatefulFp32 => {
                    if let Some(engine) = &env.stateful_fp32 {
                        self.run_stateful(variant, engine, case);
                    }
                }
                Variant::StatefulFp16 => {
                    if let Some(engine) = &env.stateful_fp16 {
                        self.run_stateful(variant, engine, case);
                    }
                }
            }
        }

        self.emit_ranking(case, first);
    }

    fn run_stateless(&mut self, variant: Variant, engine: &'e Tiered<SF, SH>, case: &BenchmarkCase) {
        let decoder = StatelessDecoder::new(&self.env.tokenizer, engine);

        let (duration, output) = time_threaded(|| decoder.generate(&case.prompt));
        self.record(variant, "", case, duration, output);

        if self.include_sync_timing {
            let started = Instant::now();
            let output = decoder.generate(&case.prompt);
            self.record(variant, SYNC_SUFFIX, case, started.elapsed(), output);
        }
    }

    fn run_stateful(&mut self, variant: Variant, engine: &'e Tiered<KF, KH>, case: &BenchmarkCase) {
        let decoder = StatefulDecoder::new(&self.env.tokenizer, engine);

        // Throwaway generation so one-time plan/compile cost stays out of
        // the measurement. A warm-up failure is logged, not fatal.
        if let Err(err) = decoder.warm_up(&case.prompt) {
            warn!("{}: warm-up failed: {err}", variant.log_suffix());
        }

        let Some(mut session) = self.fresh_session(variant, engine) else {
            return;
        };
        let (duration, output) =
            time_threaded(|| decoder.generate_with_session(&case.prompt, &mut session));
        drop(session);
        self.record(variant, "", case, duration, output);

        if self.include_sync_timing {
            let Some(mut session) = self.fresh_session(variant, engine) else {
                return;
            };
            let started = Instant::now();
            let output = decoder.generate_with_session(&case.prompt, &mut session);
            self.record(variant, SYNC_SUFFIX, case, started.elapsed(), output);
        }
    }

    /// Session created outside the timed region, one per generation.
    fn fresh_session(
        &self,
        variant: Variant,
        engine: &'e Tiered<KF, KH>,
    ) -> Option<<Tiered<KF, KH> as StatefulInfer>::Session> {
        match engine.new_session() {
            Ok(session) => Some(session),
            Err(err) => {
                warn!("{}: session creation failed, skipping run: {err}", variant.log_suffix());
                None
            }
        }
    }

    fn record(
        &mut self,
        variant: Variant,
        mode_suffix: &str,
        case: &BenchmarkCase,
        duration: Duration,
        output: String,
    ) {
        let label = format!("{}{} {}", variant.display_name(), mode_suffix, case.label);
        debug!("{}: {:.3} s", label, duration.as_secs_f64());

        let key = variant_key(&label, &case.label);
        match self.aggregates.iter_mut().find(|agg| agg.key == key) {
            Some(agg) => {
                agg.total += duration;
                agg.samples += 1;
            }
            None => self.aggregates.push(VariantAggregate {
                key,
                total: duration,
                samples: 1,
            }),
        }

        self.results.push(BenchmarkResult {
            label,
            case: case.label.clone(),
            duration,
            input: case.prompt.clone(),
            output,
        });
    }

    /// Ranking over the runs recorded for this case and no others; one
    /// case label being a suffix of another (or repeating across the
    /// corpus) must not bleed rows between ranking blocks.
    fn emit_ranking(&mut self, case: &BenchmarkCase, first: usize) {
        let mut ranked: Vec<&BenchmarkResult> = self.results[first..]
            .iter()
            .filter(|result| result.case == case.label)
            .collect();
        ranked.sort_by_key(|result| result.duration);

        self.sink
            .line(&format!("ranking for {} ({} runs):", case.label, ranked.len()));
        for (position, result) in ranked.iter().enumerate() {
            self.sink.line(&format!(
                "{}. {}: {:.3} s {}, {}",
                position + 1,
                result.label,
                result.duration.as_secs_f64(),
                result.input,
                result.output
            ));
        }
    }

    /// All completed runs, in execution order.
    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    /// Per-variant aggregates, sorted ascending by mean duration.
    pub fn aggregates(&self) -> Vec<VariantAggregate> {
        let mut aggregates = self.aggregates.clone();
        aggregates.sort_by_key(VariantAggregate::mean);
        aggregates
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Variant key of a result label: the label with the case label stripped,
/// so timings across all cases collapse onto one aggregate per variant.
fn variant_key(label: &str, case_label: &str) -> String {
    label
        .strip_suffix(case_label)
        .unwrap_or(label)
        .trim_end()
        .to_string()
}

/// Primary timing mode: the run executes alone on a dedicated thread.
fn time_threaded<R: Send>(run: impl FnOnce() -> R + Send) -> (Duration, R) {
    std::thread::scope(|scope| {
        let started = Instant::now();
        let handle = scope.spawn(run);
        let output = handle.join().expect("benchmark run panicked");
        (started.elapsed(), output)
    })
}
