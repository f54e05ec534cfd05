//! Benchmarks for score arg-max extraction
//!
//! Run with: cargo bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use half::f16;
use sokudo_harness::{ElementAccess, ScoreData, ScoreTensor};

const VOCAB: usize = 32_000;

fn scores(vocab: usize) -> Vec<f32> {
    // Deterministic spread with a single late maximum.
    let mut values: Vec<f32> = (0..vocab).map(|i| ((i * 2654435761) % 1000) as f32).collect();
    values[vocab - 7] = 2000.0;
    values
}

struct U8Scores(Vec<u8>);

impl ElementAccess for U8Scores {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> f32 {
        f32::from(self.0[index])
    }
}

fn bench_argmax(c: &mut Criterion) {
    let mut group = c.benchmark_group("argmax");

    let f32_tensor = ScoreTensor::new(1, 1, VOCAB, ScoreData::F32(scores(VOCAB))).unwrap();
    group.bench_function("f32_direct", |b| {
        b.iter(|| black_box(&f32_tensor).argmax(0, 0))
    });

    let f16_tensor = ScoreTensor::new(
        1,
        1,
        VOCAB,
        ScoreData::F16(scores(VOCAB).into_iter().map(f16::from_f32).collect()),
    )
    .unwrap();
    group.bench_function("f16_direct", |b| {
        b.iter(|| black_box(&f16_tensor).argmax(0, 0))
    });

    let indirect_tensor = ScoreTensor::new(
        1,
        1,
        VOCAB,
        ScoreData::Indirect(Box::new(U8Scores(
            scores(VOCAB).into_iter().map(|v| (v / 8.0) as u8).collect(),
        ))),
    )
    .unwrap();
    group.bench_function("accessor_fallback", |b| {
        b.iter(|| black_box(&indirect_tensor).argmax(0, 0))
    });

    // Deep time axis: the row offset computation is exercised too.
    let deep = ScoreTensor::new(1, 64, VOCAB, ScoreData::F32(scores(64 * VOCAB))).unwrap();
    group.bench_function("f32_last_row_of_64", |b| {
        b.iter(|| black_box(&deep).argmax(0, 63))
    });

    group.finish();
}

criterion_group!(benches, bench_argmax);
criterion_main!(benches);
