use serde::{Deserialize, Serialize};

/// Placeholder written in place of a field that could not be extracted.
pub const ABSENT: &str = "NA";

/// One product listing scraped from a retailer's catalogue grid.
///
/// Optional fields are `None` when no locator produced a value. Prices are
/// either `None` or a string of ASCII digits (see [`normalize_price`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub current_price: Option<String>,
    pub original_price: Option<String>,
    pub discount: Option<String>,
    pub size_or_unit: Option<String>,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
}

impl ProductRecord {
    /// Create a record with only a name. Returns `None` for a blank name.
    pub fn new(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            current_price: None,
            original_price: None,
            discount: None,
            size_or_unit: None,
            product_url: None,
            image_url: None,
        })
    }

    /// Key used to deduplicate records within a run.
    pub fn identity_key(&self) -> IdentityKey {
        match self.product_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => IdentityKey::Url(url.to_string()),
            _ => IdentityKey::Name(normalize_name(&self.name)),
        }
    }

    /// Whether the name starts with `prefix`, ignoring case.
    pub fn matches_brand(&self, prefix: &str) -> bool {
        let prefix = prefix.trim().to_lowercase();
        self.name.to_lowercase().starts_with(&prefix)
    }
}

/// Identity of a product: its URL when known, otherwise its normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Url(String),
    Name(String),
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityKey::Url(url) => write!(f, "url:{}", url),
            IdentityKey::Name(name) => write!(f, "name:{}", name),
        }
    }
}

/// Strip every non-digit character from a displayed price.
///
/// `"₹1,234"` becomes `"1234"`. Input without any digit (including `""` and
/// `"NA"`) is absent. Decimal separators are stripped as well, matching how
/// the storefronts display whole-rupee prices.
pub fn normalize_price(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Trim, collapse internal whitespace and lowercase a product name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
