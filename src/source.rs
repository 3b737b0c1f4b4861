//! Historical bar sources.
//!
//! The engine itself never does I/O; a [`DataSource`] materializes the bars
//! for a [`SourceRequest`] before analysis starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Bar;

/// Errors raised while fetching bars
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No data for {0}")]
    NotFound(String),

    #[error("Missing column: {0}")]
    MissingColumn(&'static str),

    #[error("Cannot parse {field} on line {line}")]
    Parse { line: u64, field: &'static str },
}

/// How far back the history reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lookback {
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Lookback {
    pub fn code(self) -> &'static str {
        match self {
            Lookback::OneYear => "1y",
            Lookback::TwoYears => "2y",
            Lookback::FiveYears => "5y",
            Lookback::TenYears => "10y",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1y" => Some(Lookback::OneYear),
            "2y" => Some(Lookback::TwoYears),
            "5y" => Some(Lookback::FiveYears),
            "10y" => Some(Lookback::TenYears),
            _ => None,
        }
    }

    pub fn years(self) -> i64 {
        match self {
            Lookback::OneYear => 1,
            Lookback::TwoYears => 2,
            Lookback::FiveYears => 5,
            Lookback::TenYears => 10,
        }
    }

    /// Window length in seconds (365-day years)
    pub fn seconds(self) -> i64 {
        self.years() * 365 * 86_400
    }
}

/// Bar granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    /// Provider interval code
    pub fn code(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Daily" | "1d" => Some(Interval::Daily),
            "Weekly" | "1wk" => Some(Interval::Weekly),
            "Monthly" | "1mo" => Some(Interval::Monthly),
            _ => None,
        }
    }
}

/// What history to fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRequest {
    pub symbol: String,
    pub lookback: Lookback,
    pub interval: Interval,
}

impl SourceRequest {
    pub fn new(symbol: impl Into<String>, lookback: Lookback, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            lookback,
            interval,
        }
    }
}

/// Trait for types that can load bars for a request.
///
/// An empty result is valid and is analyzed like any other series.
pub trait DataSource {
    fn fetch(&self, request: &SourceRequest) -> Result<Vec<Bar>, SourceError>;
}

/// Loads bars from `<dir>/<SYMBOL>_<interval code>.csv`.
///
/// Expected header: `timestamp,open,high,low,close` (case-insensitive, extra
/// columns ignored), timestamps in Unix seconds, ascending. Empty or
/// unparseable price cells are read as missing.
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, request: &SourceRequest) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", request.symbol, request.interval.code()))
    }
}

impl DataSource for CsvSource {
    fn fetch(&self, request: &SourceRequest) -> Result<Vec<Bar>, SourceError> {
        let path = self.path_for(request);
        if !path.is_file() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }

        let bars = load_bars_from_csv(&path)?;
        let Some(newest) = bars.last().map(|b| b.index) else {
            return Ok(bars);
        };
        let cutoff = newest.saturating_sub(request.lookback.seconds());

        let kept: Vec<Bar> = bars.into_iter().filter(|b| b.index >= cutoff).collect();
        tracing::debug!(
            path = %path.display(),
            bars = kept.len(),
            lookback = request.lookback.code(),
            "loaded csv bars"
        );
        Ok(kept)
    }
}

/// Read every row of a bar CSV file.
pub fn load_bars_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_lowercase()).collect();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(SourceError::MissingColumn(name))
    };

    let ts_col = column("timestamp")?;
    let open_col = column("open")?;
    let high_col = column("high")?;
    let low_col = column("low")?;
    let close_col = column("close")?;

    let mut bars = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = row as u64 + 2;

        let index: i64 = record
            .get(ts_col)
            .and_then(|s| s.parse().ok())
            .ok_or(SourceError::Parse {
                line,
                field: "timestamp",
            })?;

        let price = |col: usize| {
            record
                .get(col)
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };

        bars.push(Bar::new(
            index,
            price(open_col),
            price(high_col),
            price(low_col),
            price(close_col),
        ));
    }

    Ok(bars)
}
