use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use divvy_core::{ExpenseItem, Money};

use crate::category::CategoryTable;

/// Substrings whose presence marks a line as metadata rather than a
/// purchasable item. The classifier only iterates this table, so tests (and
/// future retailers) can extend it without touching the algorithm.
pub const STOP_KEYWORDS: &[&str] = &[
    // running totals and payment math
    "subtotal",
    "total",
    "tax",
    "change due",
    "amount due",
    "balance",
    // store header / footer metadata
    "walmart",
    "wal-mart",
    "store #",
    "page",
    "receipt",
    "thank you",
    "register",
    "terminal",
    "cashier",
    "date:",
    "time:",
    "www.",
    "http",
    // per-unit price markers — a rate, not a line price
    "lb @",
    "@ ",
    "price per",
    // payment methods
    "visa",
    "mastercard",
    "amex",
    "discover",
    "debit",
    "credit",
    "cash",
    // loyalty programs
    "rewards",
    "loyalty",
    "points",
    "member",
];

/// Upper bound on a single line-item price; larger numbers are assumed to be
/// OCR misreads (SKUs, phone fragments) rather than prices.
const MAX_ITEM_PRICE: i64 = 500;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date, r"\d{1,2}/\d{1,2}/\d{2,4}");
re!(re_time, r"\d{1,2}:\d{2}");
re!(re_long_digit_run, r"\d{13,}");
re!(re_numeric_token, r"\d+[.,]?\d*");
// OCR frequently appends an item code to the description: optional letter,
// six or more digits, optional letter.
re!(re_trailing_code, r"[a-z]?\d{6,}[a-z]?$");

/// Turns raw OCR text into expense items, one per surviving line.
///
/// Receipts come out of OCR as noisy single-column text with no layout, so
/// classification is keyword- and shape-based: the price is reliably the
/// rightmost number on an item line, and everything else is filtered by the
/// stop table and a handful of patterns. Lines that fail any step are
/// skipped silently — a bad line never aborts the batch.
pub struct LineClassifier {
    categories: CategoryTable,
}

impl LineClassifier {
    pub fn new(categories: CategoryTable) -> Self {
        Self { categories }
    }

    pub fn classify(&self, raw_text: &str) -> Vec<ExpenseItem> {
        raw_text
            .lines()
            .filter_map(|line| self.classify_line(line))
            .collect()
    }

    fn classify_line(&self, raw_line: &str) -> Option<ExpenseItem> {
        let line = raw_line.trim().to_lowercase();
        if line.is_empty() {
            return None;
        }
        if STOP_KEYWORDS.iter().any(|kw| line.contains(kw)) {
            return None;
        }
        if re_date().is_match(&line) || re_time().is_match(&line) {
            return None;
        }
        // Barcode / SKU heuristic: a digit run this long is never a price.
        if re_long_digit_run().is_match(&line) {
            return None;
        }

        let price_match = re_numeric_token().find_iter(&line).last()?;
        let amount = parse_price(price_match.as_str())?;

        let description = clean_description(&line[..price_match.start()]);
        if description.is_empty() || description.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let category = self.categories.category(&description);
        Some(ExpenseItem::new(description, amount, category))
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(CategoryTable::default())
    }
}

/// The rightmost numeric token is the candidate price: strip thousands
/// separators, parse, and bound-check.
fn parse_price(token: &str) -> Option<Money> {
    let clean = token.replace(',', "");
    let value = Decimal::from_str(&clean).ok()?;
    if value > Decimal::ZERO && value <= Decimal::from(MAX_ITEM_PRICE) {
        Some(Money::from_decimal(value))
    } else {
        None
    }
}

fn clean_description(prefix: &str) -> String {
    let trimmed = prefix.trim_matches(|c| c == ' ' || c == '-' || c == ':');
    let without_code = re_trailing_code().replace(trimmed, "");
    without_code
        .trim_matches(|c| c == ' ' || c == '-' || c == ':')
        .to_string()
}
