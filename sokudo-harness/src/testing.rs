//! Deterministic test doubles for the harness seams
//!
//! Scripted engines emit a fixed token sequence and record how they were
//! called, so decoding and benchmark behavior can be asserted without any
//! real model. Shared between unit tests and integration tests; not
//! intended for production use.

use crate::engine::{StatefulInfer, StatelessInfer, Tokenizer};
use crate::error::{HarnessError, Result};
use crate::score::{ScoreData, ScoreTensor};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const STUB_VOCAB: usize = 512;

/// Score tensor of shape [1, time, STUB_VOCAB] where every time row peaks
/// at `id`.
fn scores_peaking_at(id: u32, time: usize) -> Result<ScoreTensor> {
    let mut values = vec![0.0f32; time * STUB_VOCAB];
    for t in 0..time {
        values[t * STUB_VOCAB + id as usize] = 1.0;
    }
    ScoreTensor::new(1, time, STUB_VOCAB, ScoreData::F32(values))
}

/// One-character-per-token tokenizer over Unicode code points.
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(|c| c as u32).collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        Ok(ids
            .iter()
            .map(|&id| char::from_u32(id).unwrap_or('?'))
            .collect())
    }
}

/// Shared scripting state for the stub engines.
struct Script {
    emissions: Vec<u32>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
    input_lens: Mutex<Vec<usize>>,
}

impl Script {
    fn new(emissions: &[u32], fail_after: Option<usize>) -> Self {
        Self {
            emissions: emissions.to_vec(),
            fail_after,
            calls: AtomicUsize::new(0),
            input_lens: Mutex::new(Vec::new()),
        }
    }

    /// Record one call and produce scores over `time` positions, or the
    /// scripted failure.
    fn step(&self, input_len: usize, time: usize) -> Result<ScoreTensor> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.input_lens.lock().unwrap().push(input_len);

        if let Some(fail_after) = self.fail_after
            && call >= fail_after
        {
            return Err(HarnessError::Inference("scripted failure".into()));
        }

        // Past the end of the script, emit the end token.
        let id = self
            .emissions
            .get(call)
            .copied()
            .unwrap_or(crate::decode::END_OF_SEQUENCE_ID);
        scores_peaking_at(id, time)
    }
}

/// Stateless stub that emits a scripted token per call.
pub struct ScriptedStateless {
    script: Script,
}

impl ScriptedStateless {
    /// Emit each scripted token in order, then the end token forever.
    pub fn emitting(emissions: &[u32]) -> Self {
        Self {
            script: Script::new(emissions, None),
        }
    }

    /// Emit the same token on every call.
    pub fn constant(id: u32) -> Self {
        Self {
            script: Script::new(&vec![id; MAX_SCRIPT_LEN], None),
        }
    }

    /// Follow the script for `calls` calls, then fail every call.
    pub fn failing_after(calls: usize, emissions: &[u32]) -> Self {
        Self {
            script: Script::new(emissions, Some(calls)),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    /// Input length of every inference call, in order.
    pub fn input_lens(&self) -> Vec<usize> {
        self.script.input_lens.lock().unwrap().clone()
    }
}

const MAX_SCRIPT_LEN: usize = 256;

impl StatelessInfer for ScriptedStateless {
    fn infer(&self, tokens: &[u32]) -> Result<ScoreTensor> {
        self.script.step(tokens.len(), tokens.len())
    }
}

/// Opaque per-generation cache of the stateful stub. Holds every token it
/// has been fed; not cloneable, one per generation.
pub struct StubSession {
    context: Vec<u32>,
}

/// Stateful stub mirroring [`ScriptedStateless`] with session bookkeeping.
pub struct ScriptedStateful {
    script: Script,
    sessions: AtomicUsize,
}

impl ScriptedStateful {
    pub fn emitting(emissions: &[u32]) -> Self {
        Self {
            script: Script::new(emissions, None),
            sessions: AtomicUsize::new(0),
        }
    }

    pub fn constant(id: u32) -> Self {
        Self {
            script: Script::new(&vec![id; MAX_SCRIPT_LEN], None),
            sessions: AtomicUsize::new(0),
        }
    }

    pub fn failing_after(calls: usize, emissions: &[u32]) -> Self {
        Self {
            script: Script::new(emissions, Some(calls)),
            sessions: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn input_lens(&self) -> Vec<usize> {
        self.script.input_lens.lock().unwrap().clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

impl StatefulInfer for ScriptedStateful {
    type Session = StubSession;

    fn new_session(&self) -> Result<StubSession> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(StubSession {
            context: Vec::new(),
        })
    }

    fn infer(&self, tokens: &[u32], session: &mut StubSession) -> Result<ScoreTensor> {
        session.context.extend_from_slice(tokens);
        // Stateful engines score only the newest position.
        self.script.step(tokens.len(), 1)
    }
}

/// Tokenizer whose every call fails, for failure-containment tests.
pub struct FailingTokenizer;

impl Tokenizer for FailingTokenizer {
    fn encode(&self, _text: &str) -> Result<Vec<u32>> {
        Err(HarnessError::Tokenizer("scripted failure".into()))
    }

    fn decode(&self, _ids: &[u32]) -> Result<String> {
        Err(HarnessError::Tokenizer("scripted failure".into()))
    }
}
