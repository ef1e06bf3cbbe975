// SPDX-License-Identifier: PMPL-1.0-or-later

//! Library error type

use crate::eval::RunStats;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which root variable of a rule an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Neither root variable has a producer chain to join over
    #[error("rule `{rule}`: no relation produces its root variables")]
    EmptyBody { rule: String },

    /// More than one unlinked variable would seed the join
    #[error("rule `{rule}`: variable ${var} is not connected to the rule input")]
    DisconnectedVariable { rule: String, var: usize },

    #[error("rule `{rule}`: {side} root variable ${var} is never bound by the rule body")]
    UnresolvedRoot { rule: String, side: Side, var: usize },

    #[error("rule `{rule}`: variable ${var} does not belong to this rule")]
    UnknownVariable { rule: String, var: usize },

    #[error("evaluating {relation}: expected {expected} var, but found {found} var")]
    SortMismatch {
        relation: String,
        expected: String,
        found: String,
    },

    #[error("relation `{relation}`: display template needs two `{{}}` placeholders, found {placeholders}")]
    Template {
        relation: String,
        placeholders: usize,
    },

    #[error("no fixpoint within the round limit ({stats})")]
    RoundLimit { stats: RunStats },
}

impl Error {
    pub fn is_planning(&self) -> bool {
        matches!(
            self,
            Error::EmptyBody { .. }
                | Error::DisconnectedVariable { .. }
                | Error::UnresolvedRoot { .. }
                | Error::UnknownVariable { .. }
        )
    }
}
