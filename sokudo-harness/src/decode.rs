//! Greedy decoding state machines
//!
//! One decoder per execution mode, each with a single-shot "predict the
//! first continuation" operation and an iterative "generate to end of
//! sequence" operation. A generation runs strictly sequentially: every
//! step's input depends on the previous step's output, and the stateful
//! session is mutated in place by each call.
//!
//! Failures inside a generation are contained: the generation aborts with
//! an empty result and a diagnostic, never an error surfaced to the
//! benchmark loop.

use crate::engine::{StatefulInfer, StatelessInfer, Tokenizer};
use crate::error::Result;
use crate::score::ScoreTensor;
use tracing::warn;

/// Token id that ends a generation. Never appended to the sequence.
pub const END_OF_SEQUENCE_ID: u32 = 3;

/// Hard cap on prompt plus generated tokens.
pub const MAX_SEQUENCE_LEN: usize = 128;

/// Fixed input width of the stateless single-shot mode. Prompts longer
/// than this are truncated to the window; the iterative modes have no such
/// window and feed the whole growing sequence.
pub const PREDICT_WINDOW: usize = 16;

/// Token id the window is filled with past the prompt.
pub const PAD_TOKEN_ID: u32 = 0;

/// Decoded text of the padding token, stripped from all output.
pub const PAD_MARKER: &str = "<pad>";

/// Remove padding placeholders and surrounding whitespace from decoded
/// output so pad markers never leak into benchmark comparisons.
pub fn strip_padding(text: &str) -> String {
    text.replace(PAD_MARKER, "").trim().to_string()
}

/// Next-token id at the last time position of a score tensor.
fn next_token(scores: &ScoreTensor) -> u32 {
    scores.argmax(0, scores.time_size() - 1) as u32
}

/// Greedy decoder over a stateless engine.
pub struct StatelessDecoder<'a, T, E> {
    tokenizer: &'a T,
    engine: &'a E,
}

impl<'a, T: Tokenizer, E: StatelessInfer> StatelessDecoder<'a, T, E> {
    pub fn new(tokenizer: &'a T, engine: &'a E) -> Self {
        Self { tokenizer, engine }
    }

    /// Single-shot prediction of the first continuation token.
    ///
    /// The model input is a fixed [`PREDICT_WINDOW`]-wide buffer holding
    /// the prompt's leading tokens and padding. Returns an empty list when
    /// the prediction is the end token, the no-prediction index 0, or any
    /// step of the pipeline fails.
    pub fn predict_next(&self, prompt: &str) -> Vec<u32> {
        let tokens = match self.tokenizer.encode(prompt) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("predict: prompt encoding failed: {err}");
                return Vec::new();
            }
        };
        if tokens.is_empty() {
            return Vec::new();
        }

        let filled = tokens.len().min(PREDICT_WINDOW);
        let mut window = vec![PAD_TOKEN_ID; PREDICT_WINDOW];
        window[..filled].copy_from_slice(&tokens[..filled]);

        let scores = match self.engine.infer(&window) {
            Ok(scores) => scores,
            Err(err) => {
                warn!("predict: inference failed: {err}");
                return Vec::new();
            }
        };

        // Last prompt position of the window, clamped to the tensor.
        let time = (filled - 1).min(scores.time_size() - 1);
        match scores.argmax(0, time) as u32 {
            PAD_TOKEN_ID | END_OF_SEQUENCE_ID => Vec::new(),
            id => vec![id],
        }
    }

    /// Greedy generation feeding the entire growing sequence each step.
    ///
    /// Returns the decoded full sequence (prompt included), or an empty
    /// string when a step fails.
    pub fn generate(&self, prompt: &str) -> String {
        let mut tokens = match self.tokenizer.encode(prompt) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("generate: prompt encoding failed: {err}");
                return String::new();
            }
        };
        if tokens.is_empty() {
            return String::new();
        }

        while tokens.len() < MAX_SEQUENCE_LEN {
            let scores = match self.engine.infer(&tokens) {
                Ok(scores) => scores,
                Err(err) => {
                    warn!("generate: inference failed at step {}: {err}", tokens.len());
                    return String::new();
                }
            };
            let next = next_token(&scores);
            if next == END_OF_SEQUENCE_ID {
                break;
            }
            tokens.push(next);
        }

        decode_stripped(self.tokenizer, &tokens)
    }
}

/// Greedy decoder over a stateful engine. The per-generation session is
/// created inside each operation (or handed in pre-created by benchmark
/// code) and never outlives it.
pub struct StatefulDecoder<'a, T, E> {
    tokenizer: &'a T,
    engine: &'a E,
}

impl<'a, T: Tokenizer, E: StatefulInfer> StatefulDecoder<'a, T, E> {
    pub fn new(tokenizer: &'a T, engine: &'a E) -> Self {
        Self { tokenizer, engine }
    }

    /// Single-shot prediction with a throwaway session.
    pub fn predict_next(&self, prompt: &str) -> Vec<u32> {
        let tokens = match self.tokenizer.encode(prompt) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("predict: prompt encoding failed: {err}");
                return Vec::new();
            }
        };
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut session = match self.engine.new_session() {
            Ok(session) => session,
            Err(err) => {
                warn!("predict: session creation failed: {err}");
                return Vec::new();
            }
        };
        let scores = match self.engine.infer(&tokens, &mut session) {
            Ok(scores) => scores,
            Err(err) => {
                warn!("predict: inference failed: {err}");
                return Vec::new();
            }
        };
        match next_token(&scores) {
            PAD_TOKEN_ID | END_OF_SEQUENCE_ID => Vec::new(),
            id => vec![id],
        }
    }

    /// Greedy generation with a fresh internal session.
    pub fn generate(&self, prompt: &str) -> String {
        let mut session = match self.engine.new_session() {
            Ok(session) => session,
            Err(err) => {
                warn!("generate: session creation failed: {err}");
                return String::new();
            }
        };
        self.generate_with_session(prompt, &mut session)
    }

    /// Greedy generation into a caller-created session.
    ///
    /// Benchmark code pre-creates the session so its construction cost
    /// stays outside the timed region; the session must be fresh and is
    /// unusable for further generations afterwards.
    pub fn generate_with_session(&self, prompt: &str, session: &mut E::Session) -> String {
        let mut tokens = match self.tokenizer.encode(prompt) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("generate: prompt encoding failed: {err}");
                return String::new();
            }
        };
        if tokens.is_empty() {
            return String::new();
        }

        // First step feeds the whole prompt; the session carries context
        // from then on, so later steps feed only the newest token.
        let mut input = tokens.clone();
        while tokens.len() < MAX_SEQUENCE_LEN {
            let scores = match self.engine.infer(&input, session) {
                Ok(scores) => scores,
                Err(err) => {
                    warn!("generate: inference failed at step {}: {err}", tokens.len());
                    return String::new();
                }
            };
            let next = next_token(&scores);
            if next == END_OF_SEQUENCE_ID {
                break;
            }
            tokens.push(next);
            input = vec![next];
        }

        decode_stripped(self.tokenizer, &tokens)
    }

    /// One throwaway single-token generation on its own session, so that
    /// one-time plan/compile cost is paid before any timed run.
    pub fn warm_up(&self, prompt: &str) -> Result<()> {
        let tokens = self.tokenizer.encode(prompt)?;
        if tokens.is_empty() {
            return Ok(());
        }
        let mut session = self.engine.new_session()?;
        self.engine.infer(&tokens, &mut session)?;
        Ok(())
    }
}

fn decode_stripped<T: Tokenizer>(tokenizer: &T, tokens: &[u32]) -> String {
    match tokenizer.decode(tokens) {
        Ok(text) => strip_padding(&text),
        Err(err) => {
            warn!("generate: decoding failed: {err}");
            String::new()
        }
    }
}
