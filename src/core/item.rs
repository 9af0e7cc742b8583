use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Identifier for an item (watch) model in the marketplace catalog.
///
/// Items are priced by an external catalog service; the engine treats
/// the value as an opaque positive amount.
///
/// # Examples
///
/// ```
/// use chariot_engine::core::item::ItemId;
///
/// let speedy = ItemId::new("OMEGA-SPEEDMASTER");
/// let sub = ItemId::new("ROLEX-SUBMARINER");
/// assert_ne!(speedy, sub);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors arising from catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no catalog value for item {0}")]
    UnknownItem(ItemId),
    #[error("item value must be positive, got {value} for {item}")]
    InvalidValue { item: ItemId, value: Decimal },
}

/// Item → monetary value table.
///
/// The catalog is supplied by an external valuation service and is
/// immutable for the duration of a simulation run. Values in the
/// reference deployment range roughly $500–$25,000.
///
/// # Examples
///
/// ```
/// use chariot_engine::core::item::{Catalog, ItemId};
/// use rust_decimal_macros::dec;
///
/// let mut catalog = Catalog::new();
/// catalog.insert(ItemId::new("SEIKO-SKX007"), dec!(550)).unwrap();
///
/// let value = catalog.value(&ItemId::new("SEIKO-SKX007")).unwrap();
/// assert_eq!(value, dec!(550));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    values: HashMap<ItemId, Decimal>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item with its monetary value.
    pub fn insert(&mut self, item: ItemId, value: Decimal) -> Result<(), CatalogError> {
        if value <= Decimal::ZERO {
            return Err(CatalogError::InvalidValue { item, value });
        }
        self.values.insert(item, value);
        Ok(())
    }

    /// Look up the monetary value of an item.
    pub fn value(&self, item: &ItemId) -> Result<Decimal, CatalogError> {
        self.values
            .get(item)
            .copied()
            .ok_or_else(|| CatalogError::UnknownItem(item.clone()))
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.values.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All catalogued items with their values.
    pub fn entries(&self) -> impl Iterator<Item = (&ItemId, Decimal)> {
        self.values.iter().map(|(item, &value)| (item, value))
    }
}

impl FromIterator<(ItemId, Decimal)> for Catalog {
    fn from_iter<T: IntoIterator<Item = (ItemId, Decimal)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
