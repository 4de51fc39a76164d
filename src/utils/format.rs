//! Price formatting helpers for the presentation layer
//!
//! The core never rounds; these functions exist for API responses only.

/// Compact price rendering: "1.92M", "850K", "640"
pub fn format_price_millions(price: f64) -> String {
    if price >= 1_000_000.0 {
        let millions = price / 1_000_000.0;
        if millions >= 10.0 {
            format!("{:.1}M", millions)
        } else {
            format!("{:.2}M", millions)
        }
    } else if price >= 1_000.0 {
        format!("{:.0}K", price / 1_000.0)
    } else {
        format!("{:.0}", price)
    }
}

/// Full AED rendering with thousands separators: "2,094,000 AED"
pub fn format_aed(price: f64) -> String {
    let rounded = price.round() as i64;
    let mut digits = rounded.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 5);

    while digits.len() > 3 {
        let rest = digits.split_off(digits.len() - 3);
        grouped = if grouped.is_empty() {
            rest
        } else {
            format!("{},{}", rest, grouped)
        };
    }
    grouped = if grouped.is_empty() {
        digits
    } else {
        format!("{},{}", digits, grouped)
    };

    if rounded < 0 {
        format!("-{} AED", grouped)
    } else {
        format!("{} AED", grouped)
    }
}

/// Round to two decimals for response payloads
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
