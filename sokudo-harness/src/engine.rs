//! Capability seams for the external tokenizer and inference engines
//!
//! The harness never loads model artifacts itself; it consumes whatever
//! implements these traits. The two precision tiers of one execution mode
//! are distinct concrete engine types, unified behind [`Tiered`] so the
//! orchestrator keeps a single call site per mode.

use crate::error::{HarnessError, Result};
use crate::score::ScoreTensor;
use crate::variant::Precision;

/// Text to token ids and back. Deterministic for identical input and safe
/// to share across sequential generations.
pub trait Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
    fn decode(&self, ids: &[u32]) -> Result<String>;
}

/// Engine that receives the full token sequence on every call and carries
/// no memory between calls.
pub trait StatelessInfer {
    fn infer(&self, tokens: &[u32]) -> Result<ScoreTensor>;
}

/// Engine that retains decoding context in an external session object.
///
/// A session is created once per generation, mutated in place by every
/// subsequent [`infer`](Self::infer) call of that generation, and dropped
/// when the generation ends. It must never be shared across generations.
pub trait StatefulInfer {
    type Session;

    fn new_session(&self) -> Result<Self::Session>;
    fn infer(&self, tokens: &[u32], session: &mut Self::Session) -> Result<ScoreTensor>;
}

/// Sum over the two concrete engine types behind one execution mode.
///
/// Resolution may fall back across precision tiers, so the variant a caller
/// requested is not necessarily the tier actually held; downstream code
/// dispatches on this tag instead of re-inspecting the request.
#[derive(Debug)]
pub enum Tiered<F, H> {
    Fp32(F),
    Fp16(H),
}

impl<F, H> Tiered<F, H> {
    /// Precision tier actually obtained.
    pub fn precision(&self) -> Precision {
        match self {
            Tiered::Fp32(_) => Precision::Fp32,
            Tiered::Fp16(_) => Precision::Fp16,
        }
    }
}

impl<F: StatelessInfer, H: StatelessInfer> StatelessInfer for Tiered<F, H> {
    fn infer(&self, tokens: &[u32]) -> Result<ScoreTensor> {
        match self {
            Tiered::Fp32(engine) => engine.infer(tokens),
            Tiered::Fp16(engine) => engine.infer(tokens),
        }
    }
}

impl<F: StatefulInfer, H: StatefulInfer> StatefulInfer for Tiered<F, H> {
    type Session = Tiered<F::Session, H::Session>;

    fn new_session(&self) -> Result<Self::Session> {
        match self {
            Tiered::Fp32(engine) => Ok(Tiered::Fp32(engine.new_session()?)),
            Tiered::Fp16(engine) => Ok(Tiered::Fp16(engine.new_session()?)),
        }
    }

    fn infer(&self, tokens: &[u32], session: &mut Self::Session) -> Result<ScoreTensor> {
        match (self, session) {
            (Tiered::Fp32(engine), Tiered::Fp32(session)) => engine.infer(tokens, session),
            (Tiered::Fp16(engine), Tiered::Fp16(session)) => engine.infer(tokens, session),
            // A session from the other tier means caller error, not UB.
            _ => Err(HarnessError::SessionMismatch),
        }
    }
}
