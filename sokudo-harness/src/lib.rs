//! sokudo: greedy-decoding latency harness
//!
//! Benchmarks interchangeable inference-engine variants (two precision
//! tiers, each in a stateless and a stateful execution mode) against a
//! corpus of text prompts. The tokenizer and the engines themselves are
//! external collaborators plugged in through the traits in [`engine`];
//! the harness owns variant resolution with precision fallback, the
//! greedy decoding loops, score arg-max extraction, and benchmark timing,
//! ranking and aggregation.

pub mod bench;
pub mod decode;
pub mod engine;
pub mod env;
pub mod error;
pub mod resolve;
pub mod score;
pub mod testing;
pub mod variant;

pub use bench::{
    BenchmarkCase, BenchmarkResult, BenchmarkRunner, ReportSink, SYNC_SUFFIX, VariantAggregate,
};
pub use decode::{
    END_OF_SEQUENCE_ID, MAX_SEQUENCE_LEN, PAD_MARKER, PAD_TOKEN_ID, PREDICT_WINDOW,
    StatefulDecoder, StatelessDecoder, strip_padding,
};
pub use engine::{StatefulInfer, StatelessInfer, Tiered, Tokenizer};
pub use env::{Environment, HarnessConfig};
pub use error::{HarnessError, Result};
pub use resolve::{resolve_engine, resolve_engine_async};
pub use score::{ElementAccess, ScoreData, ScoreTensor};
pub use variant::{ExecutionMode, Precision, Variant};
