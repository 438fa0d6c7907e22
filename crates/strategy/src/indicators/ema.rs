/// Exponential Moving Average with bias adjustment over the expanding window.
///
/// Uses smoothing factor `alpha = 2 / (span + 1)` and the "adjusted" weighting
/// where the value at bar `t` is `Σ wⁱ·x[t-i] / Σ wⁱ` with `w = 1 - alpha`.
/// This matches `pandas.Series.ewm(span, adjust=True).mean()`, so the first
/// bar equals the first input and early values are not biased toward zero.
///
/// Returns one value per input value. Empty input yields an empty series.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span >= 1, "EMA span must be >= 1");
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut weight_sum = 0.0f64;
    let mut current = 0.0f64;

    for (i, &x) in values.iter().enumerate() {
        weight_sum = 1.0 + decay * weight_sum;
        // Incremental form of the weighted mean; exact for constant input.
        current = if i == 0 {
            x
        } else {
            current + (x - current) / weight_sum
        };
        out.push(current);
    }
    out
}

/// Final value of [`ema_series`], or `None` for empty input.
pub fn ema(values: &[f64], span: usize) -> Option<f64> {
    ema_series(values, span).last().copied()
}
