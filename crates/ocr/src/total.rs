use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use divvy_core::Money;

/// Upper bound on a plausible receipt total; anything larger is treated as an
/// OCR misread even by the fallback scan.
const MAX_TOTAL: i64 = 10_000;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Strategies in priority order. Each is tried over the whole text; the first
// one that matches anywhere contributes its LAST match (totals sit near the
// end of a receipt).
re!(re_total_label, r"(?i)total[:\s]*\$?\s*(\d+\.\d{2})");
re!(re_line_end_amount, r"(?im)\$?\s*(\d+\.\d{2})\s*$");
re!(re_amount_label, r"(?i)amount[:\s]*\$?\s*(\d+\.\d{2})");
re!(re_grand_total_label, r"(?i)grand\s*total[:\s]*\$?\s*(\d+\.\d{2})");
re!(re_balance_label, r"(?i)balance[:\s]*\$?\s*(\d+\.\d{2})");
re!(re_amount_then_keyword, r"(?i)\$?\s*(\d+\.\d{2})\s*(?:total|due|paid)");
// Fallback: every dollar-shaped token in the text.
re!(re_any_amount, r"\$?\s*(\d+\.\d{2})");

fn strategies() -> [&'static Regex; 6] {
    [
        re_total_label(),
        re_line_end_amount(),
        re_amount_label(),
        re_grand_total_label(),
        re_balance_label(),
        re_amount_then_keyword(),
    ]
}

/// Find the receipt's total in raw OCR text.
///
/// Labeled patterns win in priority order; when none of them produces an
/// in-range value, fall back to the largest dollar amount on the page. The
/// fallback is knowingly imprecise: with no "total" keyword in sight, the
/// biggest line-item price can masquerade as the total. Absent means the
/// caller should use 0.00, not fail.
pub fn extract_total(text: &str) -> Option<Money> {
    for strategy in strategies() {
        if let Some(captures) = strategy.captures_iter(text).last() {
            if let Some(total) = captures.get(1).and_then(|m| parse_in_range(m.as_str())) {
                return Some(total);
            }
        }
    }

    re_any_amount()
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| parse_in_range(m.as_str())))
        .max()
}

fn parse_in_range(s: &str) -> Option<Money> {
    let value = Decimal::from_str(s).ok()?;
    if value > Decimal::ZERO && value <= Decimal::from(MAX_TOTAL) {
        Some(Money::from_decimal(value))
    } else {
        None
    }
}
