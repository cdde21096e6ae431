use url::Url;

use crate::domain::{normalize_price, ProductRecord};
use crate::scraper::driver::ElementHandle;
use crate::scraper::locator::FieldChain;
use crate::scraper::profile::FieldLocators;

/// Why a card did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    MissingName,
    BrandMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Record(ProductRecord),
    Discarded(DiscardReason),
}

/// Turns a product card into a [`ProductRecord`].
///
/// Every field is resolved through its own [`FieldChain`]; a field that no
/// locator can read is simply absent. Only a missing name or a failed brand
/// check discards the card.
pub struct RecordExtractor {
    name: FieldChain,
    current_price: FieldChain,
    original_price: FieldChain,
    discount: FieldChain,
    size_or_unit: FieldChain,
    product_url: FieldChain,
    image_url: FieldChain,
    default_size: Option<String>,
    brand_prefix: Option<String>,
    base_url: Option<Url>,
}

impl RecordExtractor {
    pub fn new(fields: &FieldLocators, brand_prefix: Option<&str>, base_url: Option<Url>) -> Self {
        Self {
            name: FieldChain::new(&fields.name),
            current_price: FieldChain::new(&fields.current_price),
            original_price: FieldChain::new(&fields.original_price),
            discount: FieldChain::new(&fields.discount),
            size_or_unit: FieldChain::new(&fields.size_or_unit),
            product_url: FieldChain::new(&fields.product_url),
            image_url: FieldChain::new(&fields.image_url),
            default_size: fields.default_size.clone(),
            brand_prefix: brand_prefix
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
            base_url,
        }
    }

    pub async fn extract(&self, card: &dyn ElementHandle) -> Extraction {
        let Some(mut record) = self
            .name
            .resolve(card)
            .await
            .and_then(|name| ProductRecord::new(&name))
        else {
            return Extraction::Discarded(DiscardReason::MissingName);
        };

        if let Some(ref prefix) = self.brand_prefix {
            if !record.matches_brand(prefix) {
                return Extraction::Discarded(DiscardReason::BrandMismatch(record.name));
            }
        }

        record.current_price = self.current_price.resolve_with(card, normalize_price).await;
        record.original_price = self.original_price.resolve_with(card, normalize_price).await;
        record.discount = self.discount.resolve(card).await;
        record.size_or_unit = match self.size_or_unit.resolve(card).await {
            Some(size) => Some(size),
            None => self.default_size.clone(),
        };
        record.product_url = self
            .product_url
            .resolve(card)
            .await
            .map(|href| self.absolute(&href));
        record.image_url = self
            .image_url
            .resolve(card)
            .await
            .map(|src| self.absolute(&src));

        Extraction::Record(record)
    }

    /// Resolve a possibly relative link against the retailer's base URL.
    fn absolute(&self, href: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(String::from)
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}
