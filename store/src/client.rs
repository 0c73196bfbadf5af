use std::sync::Arc;

use async_trait::async_trait;
use item::{AttributeValue, Item, ItemKey};

use crate::error::StoreError;

/// Single-request operations against one table. A failed request is returned as
/// data; implementations never panic on a bad request.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn put(&self, table: &str, key: ItemKey, data: AttributeValue) -> Result<(), StoreError>;

    async fn get(&self, table: &str, key: ItemKey) -> Result<Option<Item>, StoreError>;

    /// `SET data = :val`; creates the item when absent.
    async fn update(
        &self,
        table: &str,
        key: ItemKey,
        data: AttributeValue,
    ) -> Result<(), StoreError>;

    /// Deleting a missing item is not an error.
    async fn delete(&self, table: &str, key: ItemKey) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: StoreClient + ?Sized> StoreClient for Arc<T> {
    async fn put(&self, table: &str, key: ItemKey, data: AttributeValue) -> Result<(), StoreError> {
        (**self).put(table, key, data).await
    }

    async fn get(&self, table: &str, key: ItemKey) -> Result<Option<Item>, StoreError> {
        (**self).get(table, key).await
    }

    async fn update(
        &self,
        table: &str,
        key: ItemKey,
        data: AttributeValue,
    ) -> Result<(), StoreError> {
        (**self).update(table, key, data).await
    }

    async fn delete(&self, table: &str, key: ItemKey) -> Result<(), StoreError> {
        (**self).delete(table, key).await
    }
}
