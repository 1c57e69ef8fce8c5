// src/detector.rs
use std::fmt;

use crate::types::VerifiedRoot;

/// How the newest verified root relates to the last archived one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Nothing to compare against yet
    FirstObservation,
    /// Same tree size. `resigned` is set when the log issued a fresh head
    /// (new timestamp) over the same tree.
    Unchanged { resigned: bool },
    /// The log grew
    Advanced { from: u64, to: u64 },
    /// The log shrank. Never legitimate for an append-only log.
    Regressed { from: u64, to: u64 },
}

impl Change {
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Self::Regressed { .. })
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstObservation => write!(f, "first observation"),
            Self::Unchanged { resigned: false } => write!(f, "unchanged"),
            Self::Unchanged { resigned: true } => write!(f, "unchanged (re-signed)"),
            Self::Advanced { from, to } => {
                write!(f, "advanced {} -> {} (+{})", from, to, to.saturating_sub(*from))
            }
            Self::Regressed { from, to } => write!(f, "REGRESSED {} -> {}", from, to),
        }
    }
}

/// Compare `current` against the last archived root.
///
/// Purely informational: the result is logged, it never decides whether a
/// record gets archived.
pub fn detect(current: &VerifiedRoot, last: Option<&VerifiedRoot>) -> Change {
    let Some(last) = last else {
        return Change::FirstObservation;
    };

    match current.tree_size.cmp(&last.tree_size) {
        std::cmp::Ordering::Equal => Change::Unchanged {
            resigned: current.timestamp_nanos != last.timestamp_nanos,
        },
        std::cmp::Ordering::Greater => Change::Advanced {
            from: last.tree_size,
            to: current.tree_size,
        },
        std::cmp::Ordering::Less => Change::Regressed {
            from: last.tree_size,
            to: current.tree_size,
        },
    }
}
