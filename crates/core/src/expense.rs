use serde::{Deserialize, Serialize};

use crate::money::Money;

/// One purchasable line recovered from a receipt: a cleaned description,
/// its price, and a coarse category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub item: String,
    pub amount: Money,
    pub category: String,
}

impl ExpenseItem {
    pub fn new(item: impl Into<String>, amount: Money, category: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            amount,
            category: category.into(),
        }
    }
}
