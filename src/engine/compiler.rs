//! Pattern compiler
//!
//! Turns the user-facing [`PatternSpec`] into the flat [`CompiledPattern`]
//! the matcher scans for. Three sources are supported:
//!
//! - ordered `(direction, count)` segments, as built up in a form
//! - an explicit direction sequence (including randomly drawn ones)
//! - a single direction repeated `length` times

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::{AnalysisError, Direction, Result};

/// One run of identical bars inside a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub direction: Direction,
    pub count: usize,
}

impl Segment {
    pub fn new(direction: Direction, count: usize) -> Self {
        Self { direction, count }
    }
}

/// Pattern definition as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSpec {
    /// Segments concatenated in order
    Segments(Vec<Segment>),
    /// Direction sequence used as is
    Explicit(Vec<Direction>),
    /// `direction` repeated `length` times
    Rolling { direction: Direction, length: usize },
}

impl PatternSpec {
    pub fn segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        PatternSpec::Segments(segments.into_iter().collect())
    }

    pub fn explicit(directions: impl IntoIterator<Item = Direction>) -> Self {
        PatternSpec::Explicit(directions.into_iter().collect())
    }

    pub fn rolling(direction: Direction, length: usize) -> Self {
        PatternSpec::Rolling { direction, length }
    }

    /// Explicit pattern of `len` bullish/bearish bars drawn uniformly from `rng`
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        PatternSpec::Explicit(
            (0..len)
                .map(|_| {
                    if rng.gen::<bool>() {
                        Direction::Bullish
                    } else {
                        Direction::Bearish
                    }
                })
                .collect(),
        )
    }
}

/// Flat, non-empty sequence of expected directions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CompiledPattern(Vec<Direction>);

impl CompiledPattern {
    /// Length L of the pattern, always >= 1
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Direction] {
        &self.0
    }

    /// Run-length groups, e.g. `[B, B, b]` → `[(Bullish, 2), (Bearish, 1)]`
    pub fn runs(&self) -> Vec<Segment> {
        let mut runs: Vec<Segment> = Vec::new();
        for &d in &self.0 {
            match runs.last_mut() {
                Some(last) if last.direction == d => last.count += 1,
                _ => runs.push(Segment::new(d, 1)),
            }
        }
        runs
    }
}

impl std::fmt::Display for CompiledPattern {
    /// `2x Bullish + 1x Bearish`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, run) in self.runs().iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{}x {}", run.count, run.direction)?;
        }
        Ok(())
    }
}

/// Compile `spec` under the limits in `config`.
///
/// Fails on an empty spec, a segment count outside
/// `1..=max_segment_count`, or a total length above `max_pattern_len`.
pub fn compile(spec: &PatternSpec, config: &AnalysisConfig) -> Result<CompiledPattern> {
    let directions = match spec {
        PatternSpec::Segments(segments) => {
            if segments.is_empty() {
                return Err(AnalysisError::InvalidPattern("pattern has no segments"));
            }
            let mut out = Vec::new();
            for segment in segments {
                check_range("segment count", segment.count, config.max_segment_count)?;
                out.extend(std::iter::repeat(segment.direction).take(segment.count));
            }
            out
        },
        PatternSpec::Explicit(directions) => {
            if directions.is_empty() {
                return Err(AnalysisError::InvalidPattern("explicit pattern is empty"));
            }
            directions.clone()
        },
        PatternSpec::Rolling { direction, length } => {
            check_range("rolling length", *length, config.max_pattern_len)?;
            vec![*direction; *length]
        },
    };

    check_range("pattern length", directions.len(), config.max_pattern_len)?;
    tracing::debug!(len = directions.len(), "compiled pattern");

    Ok(CompiledPattern(directions))
}

fn check_range(field: &'static str, value: usize, max: usize) -> Result<()> {
    if value < 1 || value > max {
        return Err(AnalysisError::OutOfRange {
            field,
            value: value as f64,
            min: 1.0,
            max: max as f64,
        });
    }
    Ok(())
}
