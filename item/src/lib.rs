pub mod attribute;
pub mod operation;

use std::fmt;

pub use attribute::AttributeValue;
pub use operation::{OperationKind, ParseOperationKindError};

/// Numeric hash key of an item (the `id` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ItemKey(pub u64);

impl ItemKey {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemKey {
    fn from(value: u64) -> Self {
        ItemKey(value)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: ItemKey,
    pub data: AttributeValue,
}

impl Item {
    pub fn new(key: impl Into<ItemKey>, data: AttributeValue) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }

    /// The payload the bulk loader and the put half of the mix write.
    pub fn seeded(key: impl Into<ItemKey>) -> Self {
        let key = key.into();
        Self {
            key,
            data: AttributeValue::S(format!("Data for item {}", key)),
        }
    }
}
