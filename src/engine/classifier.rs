//! Bar classifier

use crate::{Direction, OHLC};

/// Direction of a bar from its open and close.
///
/// Total: a `NaN` price compares false both ways and lands on `Neutral`;
/// incomplete bars are removed before this point.
#[inline]
pub fn classify(open: f64, close: f64) -> Direction {
    if close > open {
        Direction::Bullish
    } else if close < open {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

/// Direction series aligned 1:1 with `bars`
pub fn classify_all<T: OHLC>(bars: &[T]) -> Vec<Direction> {
    bars.iter().map(|b| classify(b.open(), b.close())).collect()
}
