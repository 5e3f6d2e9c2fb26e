use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DisplayConfig;

/// Decimal places used for percentages (margins, growth).
pub const PERCENT_DECIMALS: u32 = 2;

fn round_half_away(value: Decimal, dp: Option<u32>) -> Decimal {
    match dp {
        Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        None => value,
    }
}

/// Canonical string for a money amount in report output.
///
/// Rounds half away from zero when `currency_decimals` is set, then strips
/// trailing zeros so `"120.50"` and `"120.5"` render identically.
pub fn format_money(value: Decimal, currency_decimals: Option<u32>) -> String {
    round_half_away(value, currency_decimals).normalize().to_string()
}

/// Percentage rounded to [`PERCENT_DECIMALS`] places, without a `%` suffix.
pub fn format_percent(value: Decimal) -> String {
    format_money(value, Some(PERCENT_DECIMALS))
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len - i - 1;
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

fn fixed_fraction(frac: &str, dp: usize) -> String {
    let mut out: String = frac.chars().take(dp).collect();
    while out.len() < dp {
        out.push('0');
    }
    out
}

/// Human-facing rendering of a money amount, e.g. `-$1,234.50`.
///
/// Grouping, symbol and fixed decimals come from `[display]`; without any of
/// them set the result equals [`format_money`].
pub fn format_money_display(value: Decimal, display: &DisplayConfig) -> String {
    let rounded = round_half_away(value, display.currency_decimals);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let canonical = rounded.abs().normalize().to_string();
    let (int_part, frac_part) = canonical
        .split_once('.')
        .map(|(i, f)| (i.to_string(), f.to_string()))
        .unwrap_or_else(|| (canonical.clone(), String::new()));

    let frac_part = match display.currency_decimals {
        Some(dp) if display.currency_fixed_decimals => fixed_fraction(&frac_part, dp as usize),
        _ => frac_part,
    };
    let int_part = if display.currency_grouping {
        group_thousands(&int_part)
    } else {
        int_part
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if let Some(symbol) = display.currency_symbol.as_deref() {
        out.push_str(symbol);
    }
    out.push_str(&int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(&frac_part);
    }
    out
}
