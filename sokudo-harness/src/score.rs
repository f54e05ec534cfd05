//! Score tensor reading and greedy arg-max extraction
//!
//! One inference call produces a read-only 3-axis score buffer shaped
//! [batch, time, vocabulary]. The reader picks the highest-scoring
//! vocabulary index at a (batch, time) coordinate, using a direct slice
//! scan for the element widths engines actually produce (f32, f16) and a
//! per-element accessor for anything else.
//!
//! Out-of-range coordinates and undersized buffers degrade to index 0 with
//! a diagnostic instead of failing: a single malformed tensor must not
//! abort a whole benchmark sweep, and callers treat 0 as "no usable
//! prediction".

use crate::error::{HarnessError, Result};
use half::f16;
use tracing::warn;

/// Per-element access to a score buffer whose storage has no direct slice
/// view. Slower than the typed fast paths; used as the fallback for
/// unsupported element widths.
pub trait ElementAccess: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a linear index, widened to f32 for comparison.
    fn get(&self, index: usize) -> f32;
}

/// Backing storage of one score tensor.
pub enum ScoreData {
    F32(Vec<f32>),
    F16(Vec<f16>),
    /// Unsupported element width; scanned through [`ElementAccess`].
    Indirect(Box<dyn ElementAccess>),
}

impl ScoreData {
    fn len(&self) -> usize {
        match self {
            ScoreData::F32(values) => values.len(),
            ScoreData::F16(values) => values.len(),
            ScoreData::Indirect(accessor) => accessor.len(),
        }
    }
}

impl std::fmt::Debug for ScoreData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreData::F32(values) => write!(f, "ScoreData::F32(len {})", values.len()),
            ScoreData::F16(values) => write!(f, "ScoreData::F16(len {})", values.len()),
            ScoreData::Indirect(accessor) => {
                write!(f, "ScoreData::Indirect(len {})", accessor.len())
            }
        }
    }
}

/// Read-only [batch, time, vocabulary] score buffer from one inference call.
#[derive(Debug)]
pub struct ScoreTensor {
    batch: usize,
    time: usize,
    vocab: usize,
    data: ScoreData,
}

impl ScoreTensor {
    /// Create a tensor over existing storage.
    ///
    /// All three axes must be at least 1. The storage length is NOT
    /// validated here; a short buffer is caught at read time by the
    /// degrade-to-0 policy in [`argmax`](Self::argmax).
    pub fn new(batch: usize, time: usize, vocab: usize, data: ScoreData) -> Result<Self> {
        if batch == 0 || time == 0 || vocab == 0 {
            return Err(HarnessError::InvalidShape { batch, time, vocab });
        }
        Ok(Self {
            batch,
            time,
            vocab,
            data,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch
    }

    pub fn time_size(&self) -> usize {
        self.time
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab
    }

    /// Total number of elements actually present in the backing storage.
    pub fn element_count(&self) -> usize {
        self.data.len()
    }

    /// Vocabulary index with the maximal score at (batch, time).
    ///
    /// Ties resolve to the first (lowest) index. Out-of-range coordinates
    /// or a buffer too small for the requested row log a diagnostic and
    /// return 0; this never panics.
    pub fn argmax(&self, batch: usize, time: usize) -> usize {
        if batch >= self.batch || time >= self.time {
            warn!(
                "argmax coordinate out of range: batch {}/{}, time {}/{}",
                batch, self.batch, time, self.time
            );
            return 0;
        }

        let base = match batch
            .checked_mul(self.time)
            .and_then(|n| n.checked_add(time))
            .and_then(|n| n.checked_mul(self.vocab))
        {
            Some(base) => base,
            None => {
                warn!(
                    "argmax offset overflow for shape [{}, {}, {}]",
                    self.batch, self.time, self.vocab
                );
                return 0;
            }
        };
        let end = match base.checked_add(self.vocab) {
            Some(end) if end <= self.data.len() => end,
            _ => {
                warn!(
                    "score buffer too small: row needs elements {}..{}, have {}",
                    base,
                    base + self.vocab,
                    self.data.len()
                );
                return 0;
            }
        };

        match &self.data {
            ScoreData::F32(values) => argmax_slice(&values[base..end]),
            ScoreData::F16(values) => argmax_slice(&values[base..end]),
            ScoreData::Indirect(accessor) => argmax_indirect(accessor.as_ref(), base, self.vocab),
        }
    }
}

/// First-occurrence arg-max over a contiguous row.
fn argmax_slice<T: PartialOrd + Copy>(row: &[T]) -> usize {
    let mut best_index = 0;
    let mut best = row[0];
    for (i, &value) in row.iter().enumerate().skip(1) {
        // Strictly greater keeps the first occurrence on ties.
        if value > best {
            best = value;
            best_index = i;
        }
    }
    best_index
}

fn argmax_indirect(accessor: &dyn ElementAccess, base: usize, vocab: usize) -> usize {
    let mut best_index = 0;
    let mut best = accessor.get(base);
    for i in 1..vocab {
        let value = accessor.get(base + i);
        if value > best {
            best = value;
            best_index = i;
        }
    }
    best_index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor_f32(batch: usize, time: usize, vocab: usize, values: Vec<f32>) -> ScoreTensor {
        ScoreTensor::new(batch, time, vocab, ScoreData::F32(values)).unwrap()
    }

    /// i8 storage standing in for an element width without a fast path.
    struct I8Scores(Vec<i8>);

    impl ElementAccess for I8Scores {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn get(&self, index: usize) -> f32 {
            f32::from(self.0[index])
        }
    }

    #[test]
    fn test_argmax_picks_maximum() {
        let tensor = tensor_f32(1, 1, 5, vec![0.1, 0.9, 0.3, 0.7, 0.2]);
        assert_eq!(tensor.argmax(0, 0), 1);
    }

    #[test]
    fn test_argmax_selects_row_by_batch_and_time() {
        // batch 2, time 2, vocab 3
        let values = vec![
            1.0, 0.0, 0.0, // (0, 0) -> 0
            0.0, 1.0, 0.0, // (0, 1) -> 1
            0.0, 0.0, 1.0, // (1, 0) -> 2
            0.0, 1.0, 0.5, // (1, 1) -> 1
        ];
        let tensor = tensor_f32(2, 2, 3, values);
        assert_eq!(tensor.argmax(0, 0), 0);
        assert_eq!(tensor.argmax(0, 1), 1);
        assert_eq!(tensor.argmax(1, 0), 2);
        assert_eq!(tensor.argmax(1, 1), 1);
    }

    #[test]
    fn test_argmax_tie_breaks_to_first_occurrence() {
        let tensor = tensor_f32(1, 1, 4, vec![0.5, 0.9, 0.9, 0.9]);
        assert_eq!(tensor.argmax(0, 0), 1);

        let all_equal = tensor_f32(1, 1, 4, vec![0.3; 4]);
        assert_eq!(all_equal.argmax(0, 0), 0);
    }

    #[test]
    fn test_argmax_f16_matches_f32() {
        let values = [0.25f32, 0.5, 2.0, 1.5, 2.0];
        let tensor = ScoreTensor::new(
            1,
            1,
            5,
            ScoreData::F16(values.iter().map(|&v| f16::from_f32(v)).collect()),
        )
        .unwrap();
        // First occurrence of the maximum, same as the f32 path.
        assert_eq!(tensor.argmax(0, 0), 2);
    }

    #[test]
    fn test_argmax_indirect_fallback_same_tie_break() {
        let tensor = ScoreTensor::new(
            1,
            2,
            4,
            ScoreData::Indirect(Box::new(I8Scores(vec![1, 7, 7, 2, 0, -3, 5, 5]))),
        )
        .unwrap();
        assert_eq!(tensor.argmax(0, 0), 1);
        assert_eq!(tensor.argmax(0, 1), 2);
    }

    #[test]
    fn test_out_of_range_coordinates_degrade_to_zero() {
        let tensor = tensor_f32(2, 3, 4, vec![0.0; 24]);
        assert_eq!(tensor.argmax(2, 0), 0);
        assert_eq!(tensor.argmax(0, 3), 0);
        assert_eq!(tensor.argmax(usize::MAX, usize::MAX), 0);
    }

    #[test]
    fn test_short_buffer_degrades_to_zero() {
        // Shape claims 2*2*4 = 16 elements but only 10 are present: the
        // last row is unreadable, earlier rows still work.
        let tensor = tensor_f32(2, 2, 4, vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.5, 0.5]);
        assert_eq!(tensor.argmax(0, 0), 1);
        assert_eq!(tensor.argmax(0, 1), 3);
        assert_eq!(tensor.argmax(1, 1), 0);
    }

    #[test]
    fn test_empty_buffer_degrades_to_zero() {
        let tensor = tensor_f32(1, 1, 8, Vec::new());
        assert_eq!(tensor.argmax(0, 0), 0);
    }

    #[test]
    fn test_zero_axis_rejected() {
        let err = ScoreTensor::new(0, 1, 10, ScoreData::F32(Vec::new())).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::InvalidShape { batch: 0, time: 1, vocab: 10 }
        ));
        assert!(ScoreTensor::new(1, 0, 10, ScoreData::F32(Vec::new())).is_err());
        assert!(ScoreTensor::new(1, 1, 0, ScoreData::F32(Vec::new())).is_err());
    }
}
