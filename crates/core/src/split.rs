use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::money::Money;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("Items list cannot be empty")]
    NoItems,
    #[error("People list cannot be empty")]
    NoPeople,
}

/// Divide `total` evenly across `people`.
///
/// Every person gets the same two-decimal share; when the division does not
/// come out exact, the signed remainder is added to the first person's share
/// so the map sums to `total` to the cent.
///
/// Repeated names are NOT deduplicated here: later occurrences overwrite
/// earlier ones, so `["A", "A"]` collapses to a single entry that (after
/// remainder reconciliation) carries the whole total. Surprising, but it is
/// the contract callers rely on.
pub fn split_total(
    total: Money,
    people: &[String],
) -> Result<BTreeMap<String, Money>, SplitError> {
    if people.is_empty() {
        return Err(SplitError::NoPeople);
    }

    let share = Money::from_decimal(total.as_decimal() / Decimal::from(people.len()));

    let mut shares = BTreeMap::new();
    for person in people {
        shares.insert(person.clone(), share);
    }

    let assigned: Money = shares.values().copied().sum();
    if assigned != total {
        let first = &people[0];
        let adjusted = shares[first] + (total - assigned);
        shares.insert(first.clone(), adjusted);
    }

    Ok(shares)
}

/// Sum the amounts of loosely-typed item objects and split the result.
///
/// Each item contributes its `amount` field, falling back to `price`; values
/// may be strings or numbers. Entries that are missing or unparsable are
/// skipped, never an error — only empty input lists are rejected.
pub fn split_items(
    items: &[Value],
    people: &[String],
) -> Result<BTreeMap<String, Money>, SplitError> {
    if items.is_empty() {
        return Err(SplitError::NoItems);
    }
    if people.is_empty() {
        return Err(SplitError::NoPeople);
    }

    split_total(sum_item_amounts(items), people)
}

/// Total of all parsable `amount`/`price` fields in `items`.
pub fn sum_item_amounts(items: &[Value]) -> Money {
    items.iter().filter_map(item_amount).sum()
}

fn item_amount(item: &Value) -> Option<Money> {
    let field = item.get("amount").or_else(|| item.get("price"))?;
    match field {
        Value::String(s) => Money::parse(s),
        Value::Number(n) => n.as_f64().and_then(Money::from_f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn even_split_is_exact() {
        let shares = split_total(Money::from_cents(3000), &people(&["a", "b", "c"])).unwrap();
        assert_eq!(shares.len(), 3);
        for share in shares.values() {
            assert_eq!(*share, Money::from_cents(1000));
        }
    }

    #[test]
    fn remainder_lands_on_first_person() {
        let shares = split_total(Money::from_cents(1000), &people(&["a", "b", "c"])).unwrap();
        assert_eq!(shares["a"], Money::from_cents(334));
        assert_eq!(shares["b"], Money::from_cents(333));
        assert_eq!(shares["c"], Money::from_cents(333));
        let sum: Money = shares.values().copied().sum();
        assert_eq!(sum, Money::from_cents(1000));
    }

    #[test]
    fn remainder_can_be_negative() {
        // 20.00 / 3 rounds to 6.67; 3 × 6.67 overshoots by a cent.
        let shares = split_total(Money::from_cents(2000), &people(&["a", "b", "c"])).unwrap();
        assert_eq!(shares["a"], Money::from_cents(666));
        assert_eq!(shares["b"], Money::from_cents(667));
        let sum: Money = shares.values().copied().sum();
        assert_eq!(sum, Money::from_cents(2000));
    }

    #[test]
    fn repeated_name_collapses_to_one_entry_with_full_total() {
        // Last write wins, then the "missing" half comes back as remainder —
        // documented behavior, not a bug to fix here.
        let shares = split_total(Money::from_cents(10_000), &people(&["a", "a"])).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares["a"], Money::from_cents(10_000));
    }

    #[test]
    fn single_person_takes_everything() {
        let shares = split_total(Money::from_cents(2857), &people(&["solo"])).unwrap();
        assert_eq!(shares["solo"], Money::from_cents(2857));
    }

    #[test]
    fn zero_total_splits_to_zero() {
        let shares = split_total(Money::zero(), &people(&["a", "b"])).unwrap();
        assert_eq!(shares["a"], Money::zero());
        assert_eq!(shares["b"], Money::zero());
    }

    #[test]
    fn empty_people_rejected() {
        assert_eq!(
            split_total(Money::from_cents(100), &[]),
            Err(SplitError::NoPeople)
        );
    }

    #[test]
    fn items_split_sums_amount_fields() {
        let items = vec![json!({"amount": "3.99"}), json!({"amount": "2.49"})];
        let shares = split_items(&items, &people(&["a", "b"])).unwrap();
        assert_eq!(shares["a"], Money::from_cents(324));
        assert_eq!(shares["b"], Money::from_cents(324));
    }

    #[test]
    fn items_fall_back_to_price_field() {
        let items = vec![json!({"price": "5.00"}), json!({"amount": 5.0})];
        let shares = split_items(&items, &people(&["a"])).unwrap();
        assert_eq!(shares["a"], Money::from_cents(1000));
    }

    #[test]
    fn unparsable_items_are_skipped_not_fatal() {
        let items = vec![
            json!({"amount": "garbage"}),
            json!({"note": "no amount at all"}),
            json!({"amount": "6.00"}),
        ];
        let shares = split_items(&items, &people(&["a", "b"])).unwrap();
        assert_eq!(shares["a"], Money::from_cents(300));
        assert_eq!(shares["b"], Money::from_cents(300));
    }

    #[test]
    fn empty_items_rejected() {
        assert_eq!(
            split_items(&[], &people(&["a"])),
            Err(SplitError::NoItems)
        );
    }
}
