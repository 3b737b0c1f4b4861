//! Outcome aggregator
//!
//! Reduces the match series to next-bar statistics. Only match positions
//! that have a successor bar take part (the relevant set R); a match on the
//! last bar has no outcome yet.

use serde::Serialize;

use super::helpers::{forward_returns, fraction, safe_mean};
use super::matcher::match_positions;
use crate::{AnalysisError, Direction, Result, Target};

/// Next-bar statistics over the relevant match positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Share of cases whose next bar went in the target direction
    pub probability: f64,
    pub hit_count: usize,
    pub case_count: usize,
    pub bullish_next_prob: f64,
    pub bearish_next_prob: f64,
    pub neutral_next_prob: f64,
    /// Mean close-to-close change into the next bar, in percent
    pub avg_forward_return_pct: f64,
}

impl AggregateStats {
    pub const EMPTY: AggregateStats = AggregateStats {
        probability: 0.0,
        hit_count: 0,
        case_count: 0,
        bullish_next_prob: 0.0,
        bearish_next_prob: 0.0,
        neutral_next_prob: 0.0,
        avg_forward_return_pct: 0.0,
    };
}

/// Why a request produced no cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoMatchReason {
    /// The pattern does not occur in the series
    PatternNotFound,
    /// The pattern only occurs at the last bar
    NoSuccessorBar,
}

/// Either statistics over at least one case, or a tagged empty result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Outcome {
    Found(AggregateStats),
    NoMatches(NoMatchReason),
}

impl Outcome {
    /// Statistics, all zero for an empty result
    #[inline]
    pub fn stats(&self) -> AggregateStats {
        match self {
            Outcome::Found(stats) => *stats,
            Outcome::NoMatches(_) => AggregateStats::EMPTY,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::NoMatches(_))
    }
}

/// Aggregator output, including what the report needs for charting
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub outcome: Outcome,
    /// Number of true entries in the match series
    pub match_count: usize,
    /// Positions of R, ascending
    pub relevant: Vec<usize>,
    /// Forward return at each position of `relevant`
    pub forward_returns: Vec<f64>,
}

/// Aggregate next-bar outcomes over all match positions.
///
/// `directions`, `matches` and `closes` must be index-aligned.
pub fn aggregate(
    directions: &[Direction],
    matches: &[bool],
    target: Target,
    closes: &[f64],
) -> Result<Aggregation> {
    let n = directions.len();
    check_len("match series", n, matches.len())?;
    check_len("close series", n, closes.len())?;

    let match_count = match_positions(matches).count();
    let relevant: Vec<usize> = match_positions(matches).filter(|&i| i + 1 < n).collect();

    let returns = forward_returns(closes);
    let restricted: Vec<f64> = relevant
        .iter()
        .map(|&i| returns[i].unwrap_or(f64::NAN))
        .collect();

    if relevant.is_empty() {
        let reason = if match_count == 0 {
            NoMatchReason::PatternNotFound
        } else {
            NoMatchReason::NoSuccessorBar
        };
        return Ok(Aggregation {
            outcome: Outcome::NoMatches(reason),
            match_count,
            relevant,
            forward_returns: restricted,
        });
    }

    let next = |i: usize| directions[i + 1];
    let wanted = target.direction();

    let hit_count = relevant.iter().filter(|&&i| next(i) == wanted).count();
    let stats = AggregateStats {
        probability: fraction(relevant.iter().map(|&i| next(i) == wanted)),
        hit_count,
        case_count: relevant.len(),
        bullish_next_prob: fraction(relevant.iter().map(|&i| next(i).is_bullish())),
        bearish_next_prob: fraction(relevant.iter().map(|&i| next(i).is_bearish())),
        neutral_next_prob: fraction(relevant.iter().map(|&i| next(i).is_neutral())),
        avg_forward_return_pct: safe_mean(restricted.iter().copied()),
    };

    Ok(Aggregation {
        outcome: Outcome::Found(stats),
        match_count,
        relevant,
        forward_returns: restricted,
    })
}

pub(super) fn check_len(series: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(AnalysisError::LengthMismatch {
            series,
            expected,
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Bearish, Bullish, Neutral};

    #[test]
    fn test_probability_and_counts() {
        let dirs = [Bullish, Bullish, Bearish, Bullish, Bullish, Neutral, Bullish];
        let matches = [false, true, true, false, true, true, false];
        let closes = [10.0, 11.0, 10.0, 11.0, 12.0, 12.0, 13.0];

        let agg = aggregate(&dirs, &matches, Target::Bullish, &closes).unwrap();
        let stats = agg.outcome.stats();

        // next bars: 1→Bearish, 2→Bullish, 4→Neutral, 5→Bullish
        assert_eq!(agg.relevant, vec![1, 2, 4, 5]);
        assert_eq!(stats.case_count, 4);
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.probability, 0.5);
        assert_eq!(stats.bullish_next_prob, 0.5);
        assert_eq!(stats.bearish_next_prob, 0.25);
        assert_eq!(stats.neutral_next_prob, 0.25);
    }

    #[test]
    fn test_average_forward_return() {
        let dirs = [Bullish, Bullish, Bullish];
        let matches = [true, true, false];
        let closes = [100.0, 110.0, 99.0];

        let agg = aggregate(&dirs, &matches, Target::Bearish, &closes).unwrap();
        assert_eq!(agg.forward_returns.len(), 2);
        assert!((agg.forward_returns[0] - 10.0).abs() < 1e-9);
        assert!((agg.forward_returns[1] + 10.0).abs() < 1e-9);
        assert!(agg.outcome.stats().avg_forward_return_pct.abs() < 1e-9);
    }

    #[test]
    fn test_no_match_at_all() {
        let agg = aggregate(&[Bullish, Bearish], &[false, false], Target::Bullish, &[1.0, 2.0])
            .unwrap();
        assert_eq!(agg.outcome, Outcome::NoMatches(NoMatchReason::PatternNotFound));
        assert_eq!(agg.outcome.stats(), AggregateStats::EMPTY);
    }

    #[test]
    fn test_match_on_last_bar_only() {
        let agg = aggregate(&[Bullish, Bullish], &[false, true], Target::Bullish, &[1.0, 2.0])
            .unwrap();
        assert_eq!(agg.match_count, 1);
        assert!(agg.relevant.is_empty());
        assert_eq!(agg.outcome, Outcome::NoMatches(NoMatchReason::NoSuccessorBar));
        let stats = agg.outcome.stats();
        assert_eq!(stats.probability, 0.0);
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.case_count, 0);
    }

    #[test]
    fn test_zero_close_coerced_to_zero() {
        let dirs = [Bullish, Bullish, Bullish];
        let matches = [false, true, false];
        let closes = [1.0, 0.0, 5.0];
        let agg = aggregate(&dirs, &matches, Target::Bullish, &closes).unwrap();
        assert!(agg.forward_returns[0].is_infinite());
        assert_eq!(agg.outcome.stats().avg_forward_return_pct, 0.0);
        assert_eq!(agg.outcome.stats().probability, 1.0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = aggregate(&[Bullish, Bullish], &[false], Target::Bullish, &[1.0, 2.0])
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::LengthMismatch {
                series: "match series",
                expected: 2,
                got: 1
            }
        ));

        let err = aggregate(&[Bullish], &[false], Target::Bullish, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { series: "close series", .. }));
    }
}
