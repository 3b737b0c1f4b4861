//! Pattern matcher
//!
//! Position `i` matches when the `L` bars strictly before it equal the
//! compiled pattern element-wise; bar `i` is not part of the window. The
//! aggregator reads the outcome at `i + 1`. Overlapping occurrences are all
//! reported.

use serde::{Deserialize, Serialize};

use super::CompiledPattern;
use crate::Direction;

/// How a pattern element is compared with a bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Direction must be equal
    #[default]
    Exact,
    /// Only the "is bullish" flag is compared: a non-bullish element matches
    /// both bearish and neutral bars
    Binary,
}

impl MatchMode {
    #[inline]
    pub fn accepts(self, expected: Direction, actual: Direction) -> bool {
        match self {
            MatchMode::Exact => expected == actual,
            MatchMode::Binary => expected.is_bullish() == actual.is_bullish(),
        }
    }
}

/// Boolean series, same length as `directions`, true at every match position
pub fn match_series(
    directions: &[Direction],
    pattern: &CompiledPattern,
    mode: MatchMode,
) -> Vec<bool> {
    let n = directions.len();
    let l = pattern.len();
    let mut matches = vec![false; n];

    if l == 0 || l >= n {
        // no position has a full window before it
        return matches;
    }

    let expected = pattern.as_slice();
    for (start, window) in directions.windows(l).enumerate() {
        let i = start + l;
        if i >= n {
            break;
        }
        matches[i] = window
            .iter()
            .zip(expected)
            .all(|(&actual, &want)| mode.accepts(want, actual));
    }

    tracing::debug!(
        bars = n,
        pattern_len = l,
        matches = matches.iter().filter(|m| **m).count(),
        "scanned direction series"
    );

    matches
}

/// Positions where `matches` is true
pub fn match_positions(matches: &[bool]) -> impl Iterator<Item = usize> + '_ {
    matches
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
}
