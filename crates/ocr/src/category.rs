use std::collections::HashMap;

/// Category assigned when no keyword matches.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Compiled-in keyword table: first token of the item description → category.
/// Deliberately coarse; extending it never touches classification logic.
pub const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    // store-brand prefixes
    ("gv", "Grocery"),
    ("kr", "Grocery"),
    ("sb", "Grocery"),
    // staples
    ("milk", "Grocery"),
    ("bread", "Grocery"),
    ("eggs", "Grocery"),
    ("egg", "Grocery"),
    ("cheese", "Grocery"),
    ("butter", "Grocery"),
    ("yogurt", "Grocery"),
    ("rice", "Grocery"),
    ("pasta", "Grocery"),
    ("cereal", "Grocery"),
    ("flour", "Grocery"),
    ("sugar", "Grocery"),
    // produce
    ("apples", "Produce"),
    ("apple", "Produce"),
    ("bananas", "Produce"),
    ("banana", "Produce"),
    ("lettuce", "Produce"),
    ("tomato", "Produce"),
    ("tomatoes", "Produce"),
    ("onion", "Produce"),
    ("onions", "Produce"),
    ("potato", "Produce"),
    ("potatoes", "Produce"),
    // meat & seafood
    ("chicken", "Meat"),
    ("beef", "Meat"),
    ("pork", "Meat"),
    ("turkey", "Meat"),
    ("salmon", "Meat"),
    ("shrimp", "Meat"),
    // beverages
    ("coffee", "Beverage"),
    ("tea", "Beverage"),
    ("soda", "Beverage"),
    ("juice", "Beverage"),
    ("water", "Beverage"),
    // snacks
    ("chips", "Snacks"),
    ("candy", "Snacks"),
    ("chocolate", "Snacks"),
    ("cookies", "Snacks"),
    ("crackers", "Snacks"),
    // household
    ("paper", "Household"),
    ("detergent", "Household"),
    ("soap", "Household"),
    ("shampoo", "Household"),
    ("tissue", "Household"),
    ("towels", "Household"),
];

/// Keyword → category lookup on the first whitespace token of an item
/// description. Ties are impossible: lookup is exact-match on one token.
pub struct CategoryTable {
    entries: HashMap<String, String>,
}

impl CategoryTable {
    pub fn new(entries: HashMap<String, String>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self { entries }
    }

    /// Load a table from TOML of the form `keyword = "Category"`.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let entries: HashMap<String, String> =
            toml::from_str(content).map_err(|e| format!("Failed to parse TOML: {e}"))?;
        Ok(Self::new(entries))
    }

    pub fn category(&self, item: &str) -> String {
        item.to_lowercase()
            .split_whitespace()
            .next()
            .and_then(|token| self.entries.get(token))
            .cloned()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_KEYWORDS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
