//! The closed registry of benchmarkable engine variants
//!
//! Four variants exist: two precision tiers for each of the two execution
//! modes. The set is fixed at compile time; configuration only selects a
//! subset of it.

use serde::{Deserialize, Serialize};

/// Numeric precision tier of an engine artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp32,
    Fp16,
}

/// How an engine consumes the token sequence across decoding steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Receives the full sequence on every call, no cross-call memory.
    Stateless,
    /// Retains decoding context in a per-generation session object.
    Stateful,
}

/// One benchmarkable engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    StatelessFp32,
    StatelessFp16,
    StatefulFp32,
    StatefulFp16,
}

impl Variant {
    /// All variants, in the fixed order benchmark runs execute in.
    pub const ALL: [Variant; 4] = [
        Variant::StatelessFp32,
        Variant::StatelessFp16,
        Variant::StatefulFp32,
        Variant::StatefulFp16,
    ];

    pub fn precision(self) -> Precision {
        match self {
            Variant::StatelessFp32 | Variant::StatefulFp32 => Precision::Fp32,
            Variant::StatelessFp16 | Variant::StatefulFp16 => Precision::Fp16,
        }
    }

    pub fn execution_mode(self) -> ExecutionMode {
        match self {
            Variant::StatelessFp32 | Variant::StatelessFp16 => ExecutionMode::Stateless,
            Variant::StatefulFp32 | Variant::StatefulFp16 => ExecutionMode::Stateful,
        }
    }

    /// Human-readable name shown in ranking reports.
    pub fn display_name(self) -> &'static str {
        match self {
            Variant::StatelessFp32 => "Stateless FP32",
            Variant::StatelessFp16 => "Stateless FP16",
            Variant::StatefulFp32 => "Stateful FP32",
            Variant::StatefulFp16 => "Stateful FP16",
        }
    }

    /// Stable identifier used in configuration files and debug output.
    pub fn debug_name(self) -> &'static str {
        match self {
            Variant::StatelessFp32 => "stateless_fp32",
            Variant::StatelessFp16 => "stateless_fp16",
            Variant::StatefulFp32 => "stateful_fp32",
            Variant::StatefulFp16 => "stateful_fp16",
        }
    }

    /// Short tag appended to diagnostic log lines.
    pub fn log_suffix(self) -> &'static str {
        match self {
            Variant::StatelessFp32 => "sl32",
            Variant::StatelessFp16 => "sl16",
            Variant::StatefulFp32 => "st32",
            Variant::StatefulFp16 => "st16",
        }
    }

    /// Look up a variant by its debug name.
    pub fn from_debug_name(name: &str) -> Option<Variant> {
        Variant::ALL.iter().copied().find(|v| v.debug_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order() {
        assert_eq!(
            Variant::ALL,
            [
                Variant::StatelessFp32,
                Variant::StatelessFp16,
                Variant::StatefulFp32,
                Variant::StatefulFp16,
            ]
        );
    }

    #[test]
    fn test_axes() {
        assert_eq!(Variant::StatelessFp16.precision(), Precision::Fp16);
        assert_eq!(
            Variant::StatelessFp16.execution_mode(),
            ExecutionMode::Stateless
        );
        assert_eq!(Variant::StatefulFp32.precision(), Precision::Fp32);
        assert_eq!(
            Variant::StatefulFp32.execution_mode(),
            ExecutionMode::Stateful
        );
    }

    #[test]
    fn test_metadata_unique() {
        let display: std::collections::HashSet<&str> =
            Variant::ALL.iter().map(|v| v.display_name()).collect();
        let debug: std::collections::HashSet<&str> =
            Variant::ALL.iter().map(|v| v.debug_name()).collect();
        let suffix: std::collections::HashSet<&str> =
            Variant::ALL.iter().map(|v| v.log_suffix()).collect();
        assert_eq!(display.len(), 4);
        assert_eq!(debug.len(), 4);
        assert_eq!(suffix.len(), 4);
    }

    #[test]
    fn test_from_debug_name() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_debug_name(variant.debug_name()), Some(variant));
        }
        assert!(Variant::from_debug_name("stateless_fp64").is_none());
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&Variant::StatefulFp16).unwrap();
        assert_eq!(json, "\"stateful-fp16\"");
        let back: Variant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Variant::StatefulFp16);
    }
}
