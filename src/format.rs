/// Format a counter with grouped thousands ("1,234,567"); absent values render empty
pub fn format_stat(value: Option<u64>) -> String {
    value.map(group_thousands).unwrap_or_default()
}

/// Format today's change as "+1,234" or "-1,234"; absent values render empty
pub fn format_delta(value: Option<i64>) -> String {
    value
        .map(|v| {
            let sign = if v < 0 { '-' } else { '+' };
            format!("{sign}{}", group_thousands(v.unsigned_abs()))
        })
        .unwrap_or_default()
}

/// Short form for axis labels: 950, 12.3K, 4.5M, 1.2B
pub fn format_compact(value: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

    for (scale, suffix) in UNITS {
        if value >= scale {
            return format!("{:.1}{}", value as f64 / scale as f64, suffix);
        }
    }
    value.to_string()
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
