// Method Scheduler - expands a sanitization method name into its ordered passes
//
// Pure lookup, no I/O. Every schedule that has more than one pass ends with a
// random pass so the final on-disk content is non-deterministic.

use crate::{EngineResult, WipeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names accepted by [`WipeMethod::from_name`]
pub const METHOD_NAMES: [&str; 3] = ["clear", "purge", "destroy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    FixedByte(u8),
    Random,
}

impl PatternKind {
    pub const ZERO: PatternKind = PatternKind::FixedByte(0x00);
    pub const ONES: PatternKind = PatternKind::FixedByte(0xFF);
    pub const ALT_AA: PatternKind = PatternKind::FixedByte(0xAA);
    pub const ALT_55: PatternKind = PatternKind::FixedByte(0x55);
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::FixedByte(b) => write!(f, "0x{:02X}", b),
            PatternKind::Random => f.write_str("random"),
        }
    }
}

/// One full overwrite of a target's extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    pub pattern: PatternKind,
    /// 1-based position within the method
    pub index: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeMethod {
    pub name: String,
    pub passes: Vec<Pass>,
}

impl WipeMethod {
    const CLEAR: &'static [PatternKind] = &[PatternKind::ZERO];

    const PURGE: &'static [PatternKind] =
        &[PatternKind::ZERO, PatternKind::ONES, PatternKind::Random];

    const DESTROY: &'static [PatternKind] = &[
        PatternKind::ZERO,
        PatternKind::ONES,
        PatternKind::ZERO,
        PatternKind::ALT_AA,
        PatternKind::ALT_55,
        PatternKind::ALT_AA,
        PatternKind::Random,
    ];

    /// Look up a method by name.
    ///
    /// Accepts `clear`, `purge` and `destroy`, case-insensitively, with or
    /// without a leading `--`; `destroy-sw` is an alias of `destroy`.
    pub fn from_name(name: &str) -> EngineResult<Self> {
        let normalized = name.trim().trim_start_matches("--").to_ascii_lowercase();

        let (canonical, patterns) = match normalized.as_str() {
            "clear" => ("clear", Self::CLEAR),
            "purge" => ("purge", Self::PURGE),
            "destroy" | "destroy-sw" => ("destroy", Self::DESTROY),
            _ => {
                return Err(WipeError::Config(format!(
                    "unknown sanitization method '{}' (expected one of: {})",
                    name,
                    METHOD_NAMES.join(", ")
                )))
            }
        };

        let total = patterns.len();
        let passes = patterns
            .iter()
            .enumerate()
            .map(|(i, &pattern)| Pass {
                pattern,
                index: i + 1,
                total,
            })
            .collect();

        Ok(Self {
            name: canonical.to_string(),
            passes,
        })
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn uses_random(&self) -> bool {
        self.passes.iter().any(|p| p.pattern == PatternKind::Random)
    }

    /// Fixed byte values any pass of this method writes
    pub fn fixed_patterns(&self) -> impl Iterator<Item = u8> + '_ {
        self.passes.iter().filter_map(|p| match p.pattern {
            PatternKind::FixedByte(b) => Some(b),
            PatternKind::Random => None,
        })
    }
}

impl FromStr for WipeMethod {
    type Err = WipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for WipeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} pass", self.name, self.passes.len())?;
        if self.passes.len() != 1 {
            f.write_str("es")?;
        }
        f.write_str(")")
    }
}
