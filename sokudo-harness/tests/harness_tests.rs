//! End-to-end harness behavior over scripted engines

use sokudo_harness::testing::{CharTokenizer, ScriptedStateful, ScriptedStateless};
use sokudo_harness::{
    BenchmarkCase, BenchmarkRunner, END_OF_SEQUENCE_ID, Environment, HarnessConfig,
    MAX_SEQUENCE_LEN, PAD_MARKER, StatelessDecoder, Variant,
};

type StubEnv = Environment<
    CharTokenizer,
    ScriptedStateless,
    ScriptedStateless,
    ScriptedStateful,
    ScriptedStateful,
>;

fn cases(specs: &[(&str, &str)]) -> Vec<BenchmarkCase> {
    specs
        .iter()
        .map(|(label, prompt)| BenchmarkCase {
            label: label.to_string(),
            prompt: prompt.to_string(),
        })
        .collect()
}

#[test]
fn partially_assembled_environment_ranks_only_resolved_variants() {
    // Entries 1 and 3 of the declaration order resolve (both via their
    // preferred tier), entries 2 and 4 fail on both tiers of their run.
    let config = HarnessConfig {
        active_variants: vec![Variant::StatelessFp32, Variant::StatefulFp32],
        include_sync_timing: false,
    };
    let env = Environment::assemble(
        &config,
        || Some(CharTokenizer),
        || Some(ScriptedStateless::constant(END_OF_SEQUENCE_ID)),
        || None::<ScriptedStateless>,
        || Some(ScriptedStateful::constant(END_OF_SEQUENCE_ID)),
        || None::<ScriptedStateful>,
    )
    .unwrap();
    assert_eq!(env.active(), vec![Variant::StatelessFp32, Variant::StatefulFp32]);

    let mut runner = BenchmarkRunner::new(&env, Vec::new(), false);
    runner.run(&cases(&[("greeting", "hello")]));

    let lines = runner.into_sink();
    assert_eq!(lines.len(), 3, "header plus exactly two rows: {lines:?}");
    assert!(lines[1].starts_with("1. "));
    assert!(lines[2].starts_with("2. "));
}

#[test]
fn generation_ends_with_prompt_only_when_eos_is_immediate() {
    let tokenizer = CharTokenizer;
    let engine = ScriptedStateless::emitting(&[END_OF_SEQUENCE_ID]);
    let decoder = StatelessDecoder::new(&tokenizer, &engine);

    // The end token is never appended: the output is exactly the decoded
    // encoding of the prompt.
    let prompt = "ABC";
    let expected = tokenizer_round_trip(prompt);
    assert_eq!(decoder.generate(prompt), expected);
    assert_eq!(engine.calls(), 1);
}

fn tokenizer_round_trip(text: &str) -> String {
    use sokudo_harness::Tokenizer;
    let tokenizer = CharTokenizer;
    let ids = tokenizer.encode(text).unwrap();
    tokenizer.decode(&ids).unwrap()
}

#[test]
fn generation_always_terminates_within_the_length_bound() {
    let tokenizer = CharTokenizer;
    // An engine that never emits the end token cannot run forever.
    let engine = ScriptedStateless::constant(65);
    let decoder = StatelessDecoder::new(&tokenizer, &engine);

    for prompt_len in [1usize, 10, 100, 127] {
        let prompt: String = "B".repeat(prompt_len);
        let output = decoder.generate(&prompt);
        assert_eq!(output.chars().count(), MAX_SEQUENCE_LEN);
    }
    // Steps per run: at most 128 - initial_length (plus the step that
    // observed the cutoff).
    let total_calls = engine.calls();
    let expected: usize = [1usize, 10, 100, 127]
        .iter()
        .map(|len| MAX_SEQUENCE_LEN - len)
        .sum();
    assert_eq!(total_calls, expected);
}

#[test]
fn benchmark_output_never_leaks_pad_markers() {
    let env: StubEnv = Environment {
        tokenizer: CharTokenizer,
        stateless_fp32: Some(sokudo_harness::Tiered::Fp32(ScriptedStateless::emitting(&[
            70,
            0,
            71,
            END_OF_SEQUENCE_ID,
        ]))),
        stateless_fp16: None,
        stateful_fp32: None,
        stateful_fp16: None,
        failed: Vec::new(),
    };
    let mut runner = BenchmarkRunner::new(&env, Vec::new(), false);
    runner.run(&cases(&[("pads", "AB")]));

    for result in runner.results() {
        assert!(!result.output.contains(PAD_MARKER));
    }
    for line in runner.into_sink() {
        assert!(!line.contains(PAD_MARKER));
    }
}

#[test]
fn repeated_runs_aggregate_into_one_mean() {
    let env: StubEnv = Environment {
        tokenizer: CharTokenizer,
        stateless_fp32: None,
        stateless_fp16: None,
        stateful_fp32: Some(sokudo_harness::Tiered::Fp32(ScriptedStateful::constant(
            END_OF_SEQUENCE_ID,
        ))),
        stateful_fp16: None,
        failed: Vec::new(),
    };
    let mut runner = BenchmarkRunner::new(&env, Vec::new(), false);

    let n = 7;
    let corpus: Vec<BenchmarkCase> = (0..n)
        .map(|i| BenchmarkCase {
            label: format!("rep{i}"),
            prompt: "AB".to_string(),
        })
        .collect();
    runner.run(&corpus);

    let aggregates = runner.aggregates();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].samples, n);
    assert_eq!(aggregates[0].mean(), aggregates[0].total / n as u32);

    let total: std::time::Duration = runner.results().iter().map(|r| r.duration).sum();
    assert_eq!(aggregates[0].total, total);
}

#[test]
fn sync_timing_doubles_the_result_count() {
    let config = HarnessConfig {
        active_variants: Variant::ALL.to_vec(),
        include_sync_timing: true,
    };
    let env = Environment::assemble(
        &config,
        || Some(CharTokenizer),
        || Some(ScriptedStateless::constant(END_OF_SEQUENCE_ID)),
        || Some(ScriptedStateless::constant(END_OF_SEQUENCE_ID)),
        || Some(ScriptedStateful::constant(END_OF_SEQUENCE_ID)),
        || Some(ScriptedStateful::constant(END_OF_SEQUENCE_ID)),
    )
    .unwrap();

    let mut runner = BenchmarkRunner::new(&env, Vec::new(), config.include_sync_timing);
    runner.run(&cases(&[("p", "AB")]));

    assert_eq!(runner.results().len(), 8);
    let sync_count = runner
        .results()
        .iter()
        .filter(|r| r.label.contains(sokudo_harness::SYNC_SUFFIX.trim_start()))
        .count();
    assert_eq!(sync_count, 4);
}
