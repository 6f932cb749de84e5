/// Formats a value with exactly two decimal places.
///
/// Ties on the exact binary value round away from zero (`0.125` -> `"0.13"`),
/// negative values keep their sign, an exact zero never prints as `-0.00`, and
/// non-finite values print as `"0.00"`.
pub fn format_fixed2(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0.00".to_string();
    }

    // A double sits exactly halfway between two cents only when its fractional
    // part is an odd multiple of 1/8, which makes value * 8 an odd integer.
    let eighths = value * 8.0;
    let is_tie = eighths.fract() == 0.0 && (eighths.abs() % 2.0) == 1.0;

    if is_tie {
        // Round the fraction on its own; scaling the whole value by 100 loses
        // the half cent once it passes 2^53 / 100.
        let abs = value.abs();
        let mut whole = abs.trunc();
        let mut cents = (abs.fract() * 100.0).ceil();
        if cents >= 100.0 {
            whole += 1.0;
            cents -= 100.0;
        }
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{}{:.0}.{:02}", sign, whole, cents as u32)
    } else {
        format!("{:.2}", value)
    }
}

/// Divides, returning `0.0` when the denominator is zero.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn average(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}
