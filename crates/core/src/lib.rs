pub mod expense;
pub mod money;
pub mod split;

pub use expense::ExpenseItem;
pub use money::Money;
pub use split::{split_items, split_total, sum_item_amounts, SplitError};
