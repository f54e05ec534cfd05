//! Error types for the benchmark harness

/// Errors that can occur while assembling engines or running a generation.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("tokenizer unavailable")]
    TokenizerLoad,

    #[error("tokenizer failed")]
    Tokenizer(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("inference failed")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("input tensor allocation failed")]
    Allocation(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid score tensor shape [{batch}, {time}, {vocab}]")]
    InvalidShape {
        batch: usize,
        time: usize,
        vocab: usize,
    },

    #[error("decoding session does not match engine precision tier")]
    SessionMismatch,
}

pub type Result<T> = std::result::Result<T, HarnessError>;
