//! Session environment assembly
//!
//! Loads the tokenizer and the configured subset of engine variants. A
//! missing tokenizer is fatal; a variant that fails to resolve is recorded
//! and logged but never aborts assembly, so a session runs with whatever
//! engines are actually available.

use crate::engine::Tiered;
use crate::error::{HarnessError, Result};
use crate::resolve::resolve_engine;
use crate::variant::Variant;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Harness configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Variants to benchmark. Defaults to all four.
    #[serde(default = "all_variants")]
    pub active_variants: Vec<Variant>,
    /// Also time each run in the directly-blocking mode for comparison.
    #[serde(default)]
    pub include_sync_timing: bool,
}

fn all_variants() -> Vec<Variant> {
    Variant::ALL.to_vec()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            active_variants: all_variants(),
            include_sync_timing: false,
        }
    }
}

impl HarnessConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("invalid harness config")
    }

    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }
}

/// Tokenizer plus the per-variant engine slots of one benchmark session.
///
/// A slot is `None` when its variant was inactive or failed to resolve; a
/// `Some` slot may hold either precision tier after fallback.
pub struct Environment<T, SF, SH, KF, KH> {
    pub tokenizer: T,
    pub stateless_fp32: Option<Tiered<SF, SH>>,
    pub stateless_fp16: Option<Tiered<SF, SH>>,
    pub stateful_fp32: Option<Tiered<KF, KH>>,
    pub stateful_fp16: Option<Tiered<KF, KH>>,
    /// Active variants whose resolution failed on both tiers.
    pub failed: Vec<Variant>,
}

impl<T, SF, SH, KF, KH> Environment<T, SF, SH, KF, KH> {
    /// Load the tokenizer and resolve every active variant.
    ///
    /// Each loader may be attempted more than once across variants (both
    /// stateless variants share the same loader pair); resolution failures
    /// are not cached.
    pub fn assemble(
        config: &HarnessConfig,
        load_tokenizer: impl FnOnce() -> Option<T>,
        mut load_stateless_fp32: impl FnMut() -> Option<SF>,
        mut load_stateless_fp16: impl FnMut() -> Option<SH>,
        mut load_stateful_fp32: impl FnMut() -> Option<KF>,
        mut load_stateful_fp16: impl FnMut() -> Option<KH>,
    ) -> Result<Self> {
        let tokenizer = load_tokenizer().ok_or(HarnessError::TokenizerLoad)?;

        let mut env = Self {
            tokenizer,
            stateless_fp32: None,
            stateless_fp16: None,
            stateful_fp32: None,
            stateful_fp16: None,
            failed: Vec::new(),
        };

        for variant in Variant::ALL {
            if !config.active_variants.contains(&variant) {
                continue;
            }
            let resolved = match variant {
                Variant::StatelessFp32 => {
                    env.stateless_fp32 = resolve_engine(
                        variant.precision(),
                        Some(&mut load_stateless_fp32),
                        Some(&mut load_stateless_fp16),
                    );
                    env.stateless_fp32.is_some()
                }
                Variant::StatelessFp16 => {
                    env.stateless_fp16 = resolve_engine(
                        variant.precision(),
                        Some(&mut load_stateless_fp32),
                        Some(&mut load_stateless_fp16),
                    );
                    env.stateless_fp16.is_some()
                }
                Variant::StatefulFp32 => {
                    env.stateful_fp32 = resolve_engine(
                        variant.precision(),
                        Some(&mut load_stateful_fp32),
                        Some(&mut load_stateful_fp16),
                    );
                    env.stateful_fp32.is_some()
                }
                Variant::StatefulFp16 => {
                    env.stateful_fp16 = resolve_engine(
                        variant.precision(),
                        Some(&mut load_stateful_fp32),
                        Some(&mut load_stateful_fp16),
                    );
                    env.stateful_fp16.is_some()
                }
            };
            if resolved {
                debug!("variant {} resolved", variant.debug_name());
            } else {
                warn!("variant {} failed to resolve, skipping", variant.debug_name());
                env.failed.push(variant);
            }
        }

        Ok(env)
    }

    /// Variants that resolved to an engine, in declaration order.
    pub fn active(&self) -> Vec<Variant> {
        Variant::ALL
            .into_iter()
            .filter(|variant| match variant {
                Variant::StatelessFp32 => self.stateless_fp32.is_some(),
                Variant::StatelessFp16 => self.stateless_fp16.is_some(),
                Variant::StatefulFp32 => self.stateful_fp32.is_some(),
                Variant::StatefulFp16 => self.stateful_fp16.is_some(),
            })
            .collect()
    }
}
