pub mod product;

pub use product::{normalize_name, normalize_price, IdentityKey, ProductRecord, ABSENT};
