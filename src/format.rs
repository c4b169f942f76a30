//! Display formatting shared by the price and weather widgets.

pub const PESO: &str = "₱";

/// Format `value` the way an en-US locale does: comma thousands separators,
/// rounded to `max_frac` digits, trailing zeros trimmed down to `min_frac`.
pub fn format_number(value: f64, min_frac: usize, max_frac: usize) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }

    let max_frac = max_frac.max(min_frac);
    let rounded = format!("{:.*}", max_frac, value.abs());

    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rounded.as_str(), ""),
    };

    let mut frac = frac_part.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac.chars().all(|c| c == '0');
    let sign = if value.is_sign_negative() && !is_zero {
        "-"
    } else {
        ""
    };

    if frac.is_empty() {
        format!("{}{}", sign, group_thousands(int_part))
    } else {
        format!("{}{}.{}", sign, group_thousands(int_part), frac)
    }
}

/// `₱1,234.50` with a fixed number of fraction digits.
pub fn format_peso(value: f64, decimals: usize) -> String {
    format!("{}{}", PESO, format_number(value, decimals, decimals))
}

/// 24h change as `1.23%` / `-4.50%`, or `N/A` when the API had no value.
pub fn format_change(change: Option<f64>) -> String {
    match change {
        Some(v) if v.is_finite() => format!("{}%", format_number(v, 2, 2)),
        _ => "N/A".to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `h:mm:ss AM/PM` from 24-hour components.
pub fn format_12h(hour: u32, minute: u32, second: u32) -> String {
    let (display_hour, meridiem) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{}:{:02}:{:02} {}", display_hour, minute, second, meridiem)
}
