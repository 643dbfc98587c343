//! Technical indicators over daily price history.
//!
//! Every function takes series ordered from oldest to newest and returns a
//! series of the same length holding `NaN` wherever the indicator's lookback
//! window is not yet filled.

pub const RSI_PERIOD: usize = 14;
pub const STOCHASTIC_PERIOD: usize = 14;
pub const WILLIAMS_PERIOD: usize = 14;
pub const PROC_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;

/// Records needed before every indicator is defined. MACD's slow EMA is the
/// longest window.
pub const MIN_LOOKBACK: usize = MACD_SLOW;

/// Relative Strength Index using simple averages of gains and losses.
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return out;
    }

    for i in period..n {
        let (mut gain, mut loss) = (0.0, 0.0);
        for j in (i + 1 - period)..=i {
            let change = close[j] - close[j - 1];
            if change > 0.0 {
                gain += change;
            } else {
                loss -= change;
            }
        }
        out[i] = if loss == 0.0 {
            if gain == 0.0 { 50.0 } else { 100.0 }
        } else {
            let rs = gain / loss;
            100.0 - 100.0 / (1.0 + rs)
        };
    }
    out
}

fn window_extremes(high: &[f64], low: &[f64], end: usize, period: usize) -> (f64, f64) {
    let start = end + 1 - period;
    let highest = high[start..=end].iter().copied().fold(f64::MIN, f64::max);
    let lowest = low[start..=end].iter().copied().fold(f64::MAX, f64::min);
    (highest, lowest)
}

/// Stochastic oscillator %K.
pub fn stochastic_k(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    for i in (period - 1)..n {
        let (highest, lowest) = window_extremes(high, low, i, period);
        let range = highest - lowest;
        out[i] = if range == 0.0 {
            50.0
        } else {
            100.0 * (close[i] - lowest) / range
        };
    }
    out
}

/// Williams %R, in [-100, 0].
pub fn williams_r(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    for i in (period - 1)..n {
        let (highest, lowest) = window_extremes(high, low, i, period);
        let range = highest - lowest;
        out[i] = if range == 0.0 {
            -50.0
        } else {
            -100.0 * (highest - close[i]) / range
        };
    }
    out
}

/// Exponential moving average seeded with the simple average of the first `span` values.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if span == 0 || n < span {
        return out;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev = values[..span].iter().sum::<f64>() / span as f64;
    out[span - 1] = prev;
    for i in span..n {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// MACD line: fast EMA minus slow EMA.
pub fn macd(close: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect()
}

/// Price rate of change over `period` records, as a fraction.
pub fn price_rate_of_change(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 {
        return out;
    }

    for i in period..n {
        let base = close[i - period];
        if base != 0.0 {
            out[i] = (close[i] - base) / base;
        }
    }
    out
}

/// Cumulative on-balance volume, starting at zero.
pub fn on_balance_volume(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = Vec::with_capacity(n);
    let mut obv = 0.0;
    for i in 0..n {
        if i > 0 {
            if close[i] > close[i - 1] {
                obv += volume[i];
            } else if close[i] < close[i - 1] {
                obv -= volume[i];
            }
        }
        out.push(obv);
    }
    out
}
