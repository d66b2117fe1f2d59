//! Stock ledger: the single entry point for on-hand quantity changes.
//!
//! Every mutation of `products.quantity` goes through [`StockLedger`] (or
//! through order completion, which uses the same store primitive inside its
//! transaction). Callers express restock receipts as positive deltas and
//! sales or shrinkage as negative deltas.

use std::sync::Arc;

use stockroom_core::{DomainError, ShopId};
use stockroom_products::ProductId;

use crate::service::{EngineError, EngineResult};
use crate::store::ProductStore;

#[derive(Clone)]
pub struct StockLedger {
    products: Arc<dyn ProductStore>,
}

impl StockLedger {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    /// Atomically apply `delta` to a product's on-hand quantity and return
    /// the new quantity.
    ///
    /// Fails with `InsufficientStock` when the result would be negative, in
    /// which case nothing changes. A zero delta is rejected as a validation
    /// error rather than silently accepted.
    #[tracing::instrument(skip(self), fields(%shop_id, %product_id))]
    pub async fn adjust_quantity(
        &self,
        shop_id: ShopId,
        product_id: ProductId,
        delta: i64,
    ) -> EngineResult<i64> {
        if delta == 0 {
            return Err(EngineError::Domain(DomainError::validation(
                "stock adjustment delta must be non-zero",
            )));
        }
        let new_quantity = self
            .products
            .adjust_quantity(shop_id, product_id, delta)
            .await?;
        tracing::info!(delta, new_quantity, "stock adjusted");
        Ok(new_quantity)
    }
}
