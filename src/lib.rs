//! # candlestat - pattern-conditioned next-bar probabilities
//!
//! Estimates how often the bar following a user-defined sequence of bar
//! directions closed in a chosen direction, over an OHLC history.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlestat::prelude::*;
//!
//! // Define your OHLC data
//! struct Candle { o: f64, h: f64, l: f64, c: f64 }
//!
//! impl OHLC for Candle {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//! }
//!
//! let engine = EngineBuilder::new().build().unwrap();
//!
//! // Two bullish bars followed by one bearish bar
//! let pattern = PatternSpec::segments([
//!     Segment::new(Direction::Bullish, 2),
//!     Segment::new(Direction::Bearish, 1),
//! ]);
//!
//! let bars: Vec<Candle> = vec![];
//! let report = engine.analyze(&bars, &pattern, Target::Bullish).unwrap();
//! assert!(report.is_empty());
//! ```

pub mod config;
pub mod engine;
pub mod source;

pub mod prelude {
    pub use crate::{
        // Parallel
        analyze_parallel,
        // Config
        config::{AnalysisConfig, ParamMeta, ParamType},
        // Pipeline stages
        engine::*,
        // Data source
        source::{CsvSource, DataSource, Interval, Lookback, SourceError, SourceRequest},
        AnalysisError,
        AnalysisFailure,
        AnalysisResult,
        Bar,
        BarSeries,
        Direction,
        EngineBuilder,
        ErrorKind,
        OHLCExt,
        ProbabilityEngine,
        Result,
        Target,
        OHLC,
    };
}

use engine::{
    aggregate, classify_all, compile, match_series, CompiledPattern, MatchMode, PatternSpec,
    Report,
};
use source::{DataSource, SourceError, SourceRequest};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while preparing or running an analysis
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Length mismatch: {series} has {got} values, expected {expected}")]
    LengthMismatch {
        series: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Bar index not strictly increasing at position {position}: {current} after {previous}")]
    NonMonotonicIndex {
        position: usize,
        previous: i64,
        current: i64,
    },

    #[error("Invalid OHLC at position {position}: {reason}")]
    InvalidOHLC {
        position: usize,
        reason: &'static str,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Data source: {0}")]
    DataSource(#[from] SourceError),
}

/// Coarse classification of [`AnalysisError`].
///
/// An empty result is not an error at all; it is reported through
/// [`engine::Outcome::NoMatches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied a malformed pattern, series or configuration
    Input,
    /// Fetching the bars failed before the engine ran
    DataSource,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::DataSource(_) => ErrorKind::DataSource,
            _ => ErrorKind::Input,
        }
    }
}

// ============================================================
// DIRECTION
// ============================================================

/// Direction of a single bar, derived from open and close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn is_neutral(self) -> bool {
        matches!(self, Direction::Neutral)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "Bullish",
            Direction::Neutral => "Neutral",
            Direction::Bearish => "Bearish",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction the next bar is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Target {
    Bullish,
    Bearish,
}

impl Target {
    #[inline]
    pub fn direction(self) -> Direction {
        match self {
            Target::Bullish => Direction::Bullish,
            Target::Bearish => Direction::Bearish,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Bullish => f.write_str("bullish"),
            Target::Bearish => f.write_str("bearish"),
        }
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core OHLC data trait
///
/// A missing field is reported as `NaN`.
pub trait OHLC {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    /// Time-ordered key of the bar. Position in the slice is used when absent.
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

impl OHLC for &dyn OHLC {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn timestamp(&self) -> Option<i64> {
        (*self).timestamp()
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCExt: OHLC {
    #[inline]
    fn direction(&self) -> Direction {
        engine::classify(self.open(), self.close())
    }

    /// All four prices present
    #[inline]
    fn is_complete(&self) -> bool {
        !(self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan())
    }

    /// Check that high and low bracket the bar
    fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.high() < self.low() {
            return Err("high < low");
        }
        if self.high() < self.open().max(self.close()) {
            return Err("high below body");
        }
        if self.low() > self.open().min(self.close()) {
            return Err("low above body");
        }
        Ok(())
    }
}

impl<T: OHLC> OHLCExt for T {}

// ============================================================
// BARS
// ============================================================

/// One OHLC observation keyed by a strictly increasing index
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub index: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(index: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            index,
            open,
            high,
            low,
            close,
        }
    }
}

impl OHLC for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.index)
    }
}

/// Ascending, complete bar sequence the pipeline runs on.
///
/// Bars with a missing price are dropped on construction; the remaining
/// indices must be strictly increasing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
    dropped: usize,
}

impl BarSeries {
    /// Build from any OHLC slice, dropping incomplete bars.
    pub fn new<T: OHLC>(bars: &[T]) -> Result<Self> {
        Self::build(bars, false)
    }

    /// Like [`BarSeries::new`], additionally rejecting bars whose high/low
    /// do not bracket open and close.
    pub fn validated<T: OHLC>(bars: &[T]) -> Result<Self> {
        Self::build(bars, true)
    }

    fn build<T: OHLC>(bars: &[T], validate: bool) -> Result<Self> {
        let mut kept: Vec<Bar> = Vec::with_capacity(bars.len());
        let mut dropped = 0;

        for (position, bar) in bars.iter().enumerate() {
            if !bar.is_complete() {
                dropped += 1;
                continue;
            }
            if validate {
                bar.validate()
                    .map_err(|reason| AnalysisError::InvalidOHLC { position, reason })?;
            }

            let index = bar.timestamp().unwrap_or(position as i64);
            if let Some(prev) = kept.last() {
                if index <= prev.index {
                    return Err(AnalysisError::NonMonotonicIndex {
                        position,
                        previous: prev.index,
                        current: index,
                    });
                }
            }

            kept.push(Bar::new(index, bar.open(), bar.high(), bar.low(), bar.close()));
        }

        if dropped > 0 {
            tracing::warn!(dropped, kept = kept.len(), "dropped bars with missing prices");
        }

        Ok(Self { bars: kept, dropped })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of input bars removed for missing prices
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn indices(&self) -> Vec<i64> {
        self.bars.iter().map(|b| b.index).collect()
    }
}

// ============================================================
// PROBABILITY ENGINE
// ============================================================

/// Runs the classify → compile → match → aggregate → report pipeline.
///
/// Holds only configuration; every call works on its own copy of the input.
#[derive(Debug, Clone)]
pub struct ProbabilityEngine {
    config: config::AnalysisConfig,
}

impl ProbabilityEngine {
    pub fn new(config: config::AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &config::AnalysisConfig {
        &self.config
    }

    // ===========================================
    // LOW-LEVEL: Primitives
    // ===========================================

    /// Drop incomplete bars and check ordering.
    pub fn prepare<T: OHLC>(&self, bars: &[T]) -> Result<BarSeries> {
        if self.config.validate_data {
            BarSeries::validated(bars)
        } else {
            BarSeries::new(bars)
        }
    }

    /// Compile a pattern spec under this engine's limits.
    #[inline]
    pub fn compile(&self, spec: &PatternSpec) -> Result<CompiledPattern> {
        compile(spec, &self.config)
    }

    /// Boolean match series aligned with `series`.
    pub fn match_series(&self, series: &BarSeries, pattern: &CompiledPattern) -> Vec<bool> {
        let directions = classify_all(series.bars());
        match_series(&directions, pattern, self.config.match_mode)
    }

    #[inline]
    pub fn match_mode(&self) -> MatchMode {
        self.config.match_mode
    }

    // ===========================================
    // HIGH-LEVEL: Full analysis
    // ===========================================

    /// Analyze `bars` for occurrences of `spec` and the next-bar outcome.
    ///
    /// The pattern is compiled before the bars are touched, so a malformed
    /// pattern is reported even for an empty series.
    pub fn analyze<T: OHLC>(
        &self,
        bars: &[T],
        spec: &PatternSpec,
        target: Target,
    ) -> Result<Report> {
        let pattern = self.compile(spec)?;
        let series = self.prepare(bars)?;
        self.run(&series, pattern, target)
    }

    /// Analyze an already prepared series.
    pub fn analyze_series(
        &self,
        series: &BarSeries,
        spec: &PatternSpec,
        target: Target,
    ) -> Result<Report> {
        let pattern = self.compile(spec)?;
        self.run(series, pattern, target)
    }

    /// Fetch bars from `source` and analyze them.
    pub fn analyze_source<S: DataSource + ?Sized>(
        &self,
        source: &S,
        request: &SourceRequest,
        spec: &PatternSpec,
        target: Target,
    ) -> Result<Report> {
        let pattern = self.compile(spec)?;
        let bars = source.fetch(request)?;
        tracing::debug!(symbol = %request.symbol, bars = bars.len(), "fetched bars");
        let series = self.prepare(&bars)?;
        self.run(&series, pattern, target)
    }

    fn run(&self, series: &BarSeries, pattern: CompiledPattern, target: Target) -> Result<Report> {
        let directions = classify_all(series.bars());
        let matches = match_series(&directions, &pattern, self.config.match_mode);
        let closes = series.closes();
        let aggregation = aggregate(&directions, &matches, target, &closes)?;

        tracing::debug!(
            bars = series.len(),
            pattern_len = pattern.len(),
            matches = aggregation.match_count,
            cases = aggregation.relevant.len(),
            "pattern analysis complete"
        );
        if let engine::Outcome::NoMatches(reason) = aggregation.outcome {
            tracing::warn!(pattern = %pattern, ?reason, "no matching pattern found");
        }

        Report::assemble(series, pattern, target, &matches, aggregation)
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating ProbabilityEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: config::AnalysisConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: config::AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Upper bound for a single segment's repeat count
    pub fn max_segment_count(mut self, count: usize) -> Self {
        self.config.max_segment_count = count;
        self
    }

    /// Upper bound for the compiled pattern length
    pub fn max_pattern_len(mut self, len: usize) -> Self {
        self.config.max_pattern_len = len;
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.config.match_mode = mode;
        self
    }

    /// Enable/disable high/low consistency checks
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<ProbabilityEngine> {
        ProbabilityEngine::new(self.config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument
#[derive(Debug)]
pub struct AnalysisResult {
    pub symbol: String,
    pub report: Report,
}

/// Error from analyzing a single instrument
#[derive(Debug)]
pub struct AnalysisFailure {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Analyze several instruments against the same pattern in parallel
pub fn analyze_parallel<'a, T, I>(
    engine: &ProbabilityEngine,
    instruments: I,
    spec: &PatternSpec,
    target: Target,
) -> (Vec<AnalysisResult>, Vec<AnalysisFailure>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .analyze(bars, spec, target)
                .map(|report| AnalysisResult {
                    symbol: symbol.to_string(),
                    report,
                })
                .map_err(|error| AnalysisFailure {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NoMatchReason, Outcome, Segment};

    /// Bar with open/close only; high and low wrap the body
    fn oc(index: i64, open: f64, close: f64) -> Bar {
        Bar::new(index, open, open.max(close) + 1.0, open.min(close) - 1.0, close)
    }

    fn bullish_then_bearish() -> Vec<Bar> {
        vec![
            oc(0, 10.0, 11.0),
            oc(1, 11.0, 12.0),
            oc(2, 12.0, 11.0),
            oc(3, 11.0, 12.0),
            oc(4, 12.0, 13.0),
            oc(5, 13.0, 12.0),
        ]
    }

    #[test]
    fn test_direction_helpers() {
        assert!(Direction::Bullish.is_bullish());
        assert!(Direction::Bearish.is_bearish());
        assert!(Direction::Neutral.is_neutral());
        assert_eq!(Target::Bearish.direction(), Direction::Bearish);
        assert_eq!(Target::Bullish.to_string(), "bullish");
    }

    #[test]
    fn test_bar_series_drops_missing() {
        let bars = vec![
            oc(0, 10.0, 11.0),
            Bar::new(1, f64::NAN, 12.0, 10.0, 11.0),
            oc(2, 11.0, 10.0),
        ];
        let series = BarSeries::new(&bars).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.dropped(), 1);
        assert_eq!(series.indices(), vec![0, 2]);
    }

    #[test]
    fn test_bar_series_rejects_duplicate_index() {
        let bars = vec![oc(5, 10.0, 11.0), oc(5, 11.0, 12.0)];
        let err = BarSeries::new(&bars).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::NonMonotonicIndex {
                position: 1,
                previous: 5,
                current: 5
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_validated_rejects_inverted_range() {
        let bars = vec![Bar::new(0, 10.0, 9.0, 11.0, 10.5)];
        assert!(BarSeries::new(&bars).is_ok());
        assert!(matches!(
            BarSeries::validated(&bars),
            Err(AnalysisError::InvalidOHLC { position: 0, .. })
        ));
    }

    #[test]
    fn test_engine_builder_rejects_bad_config() {
        assert!(EngineBuilder::new().build().is_ok());
        assert!(EngineBuilder::new().max_segment_count(0).build().is_err());
        assert!(EngineBuilder::new()
            .max_segment_count(10)
            .max_pattern_len(5)
            .build()
            .is_err());
    }

    #[test]
    fn test_analyze_two_bullish() {
        let engine = EngineBuilder::new().build().unwrap();
        let spec = PatternSpec::segments([Segment::new(Direction::Bullish, 2)]);
        let report = engine
            .analyze(&bullish_then_bearish(), &spec, Target::Bearish)
            .unwrap();

        // matches at positions 2 and 5; only 2 has a successor (bullish)
        assert_eq!(report.match_indices, vec![2, 5]);
        assert_eq!(report.relevant_indices, vec![2]);
        let stats = report.stats();
        assert_eq!(stats.case_count, 1);
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.probability, 0.0);
        assert_eq!(stats.bullish_next_prob, 1.0);
    }

    #[test]
    fn test_empty_bars_are_no_match() {
        let engine = EngineBuilder::new().build().unwrap();
        let spec = PatternSpec::rolling(Direction::Bullish, 1);
        let bars: Vec<Bar> = vec![];
        let report = engine.analyze(&bars, &spec, Target::Bullish).unwrap();
        assert!(report.is_empty());
        assert_eq!(
            report.outcome,
            Outcome::NoMatches(NoMatchReason::PatternNotFound)
        );
    }

    #[test]
    fn test_pattern_error_before_data() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars = vec![oc(1, 1.0, 2.0), oc(1, 1.0, 2.0)];
        // Invalid pattern wins over invalid series
        let err = engine
            .analyze(&bars, &PatternSpec::Segments(vec![]), Target::Bullish)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidPattern(_)));
    }

    #[test]
    fn test_parallel_analysis() {
        let engine = EngineBuilder::new().build().unwrap();
        let spec = PatternSpec::rolling(Direction::Bullish, 1);

        let good = bullish_then_bearish();
        let bad = vec![oc(3, 1.0, 2.0), oc(2, 2.0, 3.0)];

        let instruments: Vec<(&str, &[Bar])> = vec![("SPY", &good), ("BAD", &bad)];
        let (results, errors) = analyze_parallel(&engine, instruments, &spec, Target::Bullish);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "SPY");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
    }
}
