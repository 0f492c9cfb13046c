/// Rounds to `scale` decimal places, half away from zero, on the shortest
/// decimal form of `value` (so 2.675 becomes 2.68, not 2.67).
pub fn round_half_up(value: f64, scale: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    if value == 0.0 {
        return 0.0;
    }

    let repr = format!("{}", value.abs());
    let Some((_, frac)) = repr.split_once('.') else {
        return value;
    };
    if frac.len() <= scale {
        return value;
    }

    let cut = repr.len() - (frac.len() - scale);
    let truncated: f64 = repr[..cut].trim_end_matches('.').parse().unwrap_or(value.abs());
    let bumped = if frac.as_bytes()[scale] >= b'5' {
        truncated + 10f64.powi(-(scale as i32))
    } else {
        truncated
    };

    let cleaned: f64 = format!("{bumped:.scale$}").parse().unwrap_or(bumped);
    if cleaned == 0.0 {
        return 0.0;
    }
    cleaned.copysign(value)
}

/// Division where a zero divisor yields null.
pub fn checked_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(_), Some(d)) if d == 0.0 => None,
        (Some(n), Some(d)) => Some(n / d),
        _ => None,
    }
}
