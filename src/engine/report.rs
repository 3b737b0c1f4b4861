//! Report assembler
//!
//! Packages the aggregation with the series a front end charts: the close
//! prices, the three-way next-bar comparison and the forward returns after
//! each match. Only display scaling happens here; no new statistics.

use serde::Serialize;

use super::aggregator::{check_len, AggregateStats, Aggregation, NoMatchReason, Outcome};
use super::compiler::CompiledPattern;
use super::matcher::match_positions;
use crate::{AnalysisError, BarSeries, Result, Target};

/// One chart point keyed by bar index
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub index: i64,
    pub value: f64,
}

/// Next-bar direction shares in percent (0..=100), for the bar chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub bullish_pct: f64,
    pub bearish_pct: f64,
    pub neutral_pct: f64,
}

/// Read-only result of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub target: Target,
    pub pattern: CompiledPattern,
    pub outcome: Outcome,
    /// Every match position, including one on the last bar
    pub match_count: usize,
    pub match_indices: Vec<i64>,
    /// Match positions with a successor bar (the cases)
    pub relevant_indices: Vec<i64>,
    pub close_series: Vec<SeriesPoint>,
    /// Forward return after each case; undefined values removed
    pub forward_returns: Vec<SeriesPoint>,
}

impl Report {
    /// Build the report for `series`.
    ///
    /// `matches` must be aligned with the series and every case position in
    /// `aggregation` must name a bar of it.
    pub fn assemble(
        series: &BarSeries,
        pattern: CompiledPattern,
        target: Target,
        matches: &[bool],
        aggregation: Aggregation,
    ) -> Result<Self> {
        let bars = series.bars();
        check_len("match series", bars.len(), matches.len())?;
        check_len(
            "forward returns",
            aggregation.relevant.len(),
            aggregation.forward_returns.len(),
        )?;
        if let Some(&pos) = aggregation.relevant.iter().find(|&&i| i >= bars.len()) {
            return Err(AnalysisError::LengthMismatch {
                series: "case positions",
                expected: bars.len(),
                got: pos + 1,
            });
        }
        let key = |i: usize| bars[i].index;

        let forward_returns = aggregation
            .relevant
            .iter()
            .zip(&aggregation.forward_returns)
            .filter(|(_, r)| !r.is_nan())
            .map(|(&i, &value)| SeriesPoint {
                index: key(i),
                value,
            })
            .collect();

        Ok(Self {
            target,
            pattern,
            outcome: aggregation.outcome,
            match_count: aggregation.match_count,
            match_indices: match_positions(matches).map(key).collect(),
            relevant_indices: aggregation.relevant.iter().map(|&i| key(i)).collect(),
            close_series: bars
                .iter()
                .map(|b| SeriesPoint {
                    index: b.index,
                    value: b.close,
                })
                .collect(),
            forward_returns,
        })
    }

    #[inline]
    pub fn stats(&self) -> AggregateStats {
        self.outcome.stats()
    }

    /// True for the "no matching pattern" condition
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outcome.is_empty()
    }

    pub fn comparison(&self) -> Comparison {
        let stats = self.stats();
        Comparison {
            bullish_pct: stats.bullish_next_prob * 100.0,
            bearish_pct: stats.bearish_next_prob * 100.0,
            neutral_pct: stats.neutral_next_prob * 100.0,
        }
    }

    pub fn headline(&self) -> String {
        match self.outcome {
            Outcome::Found(stats) => format!(
                "Probability of a {} next bar after {}: {}",
                self.target,
                self.pattern,
                format_pct(stats.probability)
            ),
            Outcome::NoMatches(NoMatchReason::PatternNotFound) => {
                format!("No matching pattern found for {}", self.pattern)
            },
            Outcome::NoMatches(NoMatchReason::NoSuccessorBar) => format!(
                "{} only occurs at the last bar; no next bar to evaluate",
                self.pattern
            ),
        }
    }

    /// `hits: 4 of 7 cases`
    pub fn hit_line(&self) -> String {
        let stats = self.stats();
        format!("hits: {} of {} cases", stats.hit_count, stats.case_count)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.headline())?;
        if self.is_empty() {
            return Ok(());
        }
        let stats = self.stats();
        writeln!(f, "{}", self.hit_line())?;
        writeln!(
            f,
            "next bar bullish {} | bearish {} | unchanged {}",
            format_pct(stats.bullish_next_prob),
            format_pct(stats.bearish_next_prob),
            format_pct(stats.neutral_next_prob)
        )?;
        write!(
            f,
            "average change (close to close): {:.2}%",
            stats.avg_forward_return_pct
        )
    }
}

/// Ratio in `[0, 1]` as a percentage with two decimals, e.g. `57.14%`
pub fn format_pct(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::engine::{aggregate, classify_all, compile, match_series, MatchMode, PatternSpec};
    use crate::{Bar, Direction};

    fn report_for(bars: &[Bar], spec: &PatternSpec, target: Target) -> Report {
        let series = BarSeries::new(bars).unwrap();
        let pattern = compile(spec, &AnalysisConfig::default()).unwrap();
        let dirs = classify_all(series.bars());
        let matches = match_series(&dirs, &pattern, MatchMode::Exact);
        let agg = aggregate(&dirs, &matches, target, &series.closes()).unwrap();
        Report::assemble(&series, pattern, target, &matches, agg).unwrap()
    }

    fn bars() -> Vec<Bar> {
        vec![
            Bar::new(100, 10.0, 11.5, 9.5, 11.0),
            Bar::new(200, 11.0, 12.5, 10.5, 12.0),
            Bar::new(300, 12.0, 12.5, 10.5, 11.0),
            Bar::new(400, 11.0, 12.5, 10.5, 12.0),
        ]
    }

    #[test]
    fn test_series_keyed_by_bar_index() {
        let r = report_for(&bars(), &PatternSpec::rolling(Direction::Bullish, 1), Target::Bullish);
        assert_eq!(r.match_indices, vec![200, 300]);
        assert_eq!(r.relevant_indices, vec![200, 300]);
        assert_eq!(r.close_series.len(), 4);
        assert_eq!(r.close_series[3], SeriesPoint { index: 400, value: 12.0 });
        assert_eq!(r.forward_returns.len(), 2);
        assert_eq!(r.forward_returns[0].index, 200);
    }

    #[test]
    fn test_headline_and_display() {
        let r = report_for(&bars(), &PatternSpec::rolling(Direction::Bullish, 1), Target::Bullish);
        // after bar 200 comes a bearish bar, after 300 a bullish one
        assert_eq!(
            r.headline(),
            "Probability of a bullish next bar after 1x Bullish: 50.00%"
        );
        assert_eq!(r.hit_line(), "hits: 1 of 2 cases");

        let text = r.to_string();
        assert!(text.contains("next bar bullish 50.00% | bearish 50.00% | unchanged 0.00%"));
        assert!(text.contains("average change (close to close):"));
    }

    #[test]
    fn test_comparison_percentages() {
        let r = report_for(&bars(), &PatternSpec::rolling(Direction::Bullish, 1), Target::Bearish);
        let c = r.comparison();
        assert_eq!(c.bullish_pct, 50.0);
        assert_eq!(c.bearish_pct, 50.0);
        assert_eq!(c.neutral_pct, 0.0);
    }

    #[test]
    fn test_empty_report() {
        let r = report_for(&bars(), &PatternSpec::rolling(Direction::Bearish, 2), Target::Bullish);
        assert!(r.is_empty());
        assert_eq!(r.headline(), "No matching pattern found for 2x Bearish");
        assert_eq!(r.to_string(), "No matching pattern found for 2x Bearish\n");
        assert_eq!(r.comparison().bullish_pct, 0.0);
        assert!(r.forward_returns.is_empty());
    }

    #[test]
    fn test_assemble_rejects_misaligned_inputs() {
        let series = BarSeries::new(&bars()[..2]).unwrap();
        let spec = PatternSpec::rolling(Direction::Bullish, 1);
        let pattern = compile(&spec, &AnalysisConfig::default()).unwrap();
        let dirs = classify_all(series.bars());
        let matches = match_series(&dirs, &pattern, MatchMode::Exact);
        let agg = aggregate(&dirs, &matches, Target::Bullish, &series.closes()).unwrap();

        let long = [false, true, false, true];
        let err = Report::assemble(&series, pattern.clone(), Target::Bullish, &long, agg.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::LengthMismatch {
                series: "match series",
                expected: 2,
                got: 4
            }
        ));

        let stray = Aggregation {
            relevant: vec![5],
            forward_returns: vec![1.0],
            ..agg
        };
        let err = Report::assemble(&series, pattern, Target::Bullish, &matches, stray).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { series: "case positions", .. }));
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.571428), "57.14%");
        assert_eq!(format_pct(0.0), "0.00%");
        assert_eq!(format_pct(1.0), "100.00%");
    }

    #[test]
    fn test_report_serializes() {
        let r = report_for(&bars(), &PatternSpec::rolling(Direction::Bullish, 1), Target::Bullish);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["target"], "Bullish");
        assert_eq!(json["pattern"], serde_json::json!(["Bullish"]));
        assert_eq!(json["outcome"]["Found"]["case_count"], 2);
    }
}
