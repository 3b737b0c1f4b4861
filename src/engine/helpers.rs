//! Numeric helpers shared by the aggregator and the report.

/// Mean that never yields an undefined value.
///
/// `NaN` elements are skipped. An empty input, or a mean that is not finite
/// (e.g. an infinite forward return), is reported as exactly `0.0`.
///
/// The two cases differ: a `0 / 0` return is `NaN` and only drops out of the
/// mean, while a single `x / 0` return is infinite and zeroes the whole mean.
pub fn safe_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));

    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    if mean.is_finite() {
        mean
    } else {
        0.0
    }
}

/// Share of `true` values, `0.0` for an empty input
pub fn fraction<I>(flags: I) -> f64
where
    I: IntoIterator<Item = bool>,
{
    safe_mean(flags.into_iter().map(|f| if f { 1.0 } else { 0.0 }))
}

/// Close-to-close change in percent.
///
/// A zero `close` yields a non-finite value; callers average through
/// [`safe_mean`].
#[inline]
pub fn forward_return_pct(close: f64, next_close: f64) -> f64 {
    (next_close - close) / close * 100.0
}

/// Percent change from each close to the next; `None` for the last bar
pub fn forward_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut out: Vec<Option<f64>> = closes
        .windows(2)
        .map(|w| Some(forward_return_pct(w[0], w[1])))
        .collect();
    if !closes.is_empty() {
        out.push(None);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_mean_empty_is_zero() {
        let empty: Vec<f64> = vec![];
        assert_eq!(safe_mean(empty), 0.0);
        assert_eq!(safe_mean([f64::NAN, f64::NAN]), 0.0);
    }

    #[test]
    fn test_safe_mean_skips_nan() {
        assert!((safe_mean([1.0, f64::NAN, 3.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_safe_mean_coerces_infinite() {
        assert_eq!(safe_mean([1.0, f64::INFINITY]), 0.0);
        assert_eq!(safe_mean([f64::INFINITY, f64::NEG_INFINITY]), 0.0);
    }

    #[test]
    fn test_fraction() {
        assert_eq!(fraction([true, false, true, true]), 0.75);
        assert_eq!(fraction(std::iter::empty::<bool>()), 0.0);
    }

    #[test]
    fn test_forward_returns() {
        let r = forward_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 3);
        assert!((r[0].unwrap() - 10.0).abs() < 1e-9);
        assert!((r[1].unwrap() + 10.0).abs() < 1e-9);
        assert_eq!(r[2], None);
        assert!(forward_returns(&[]).is_empty());
    }

    #[test]
    fn test_forward_return_zero_close() {
        assert!(forward_return_pct(0.0, 1.0).is_infinite());
        assert!(forward_return_pct(0.0, 0.0).is_nan());
    }
}
