//! In-memory store for tests/dev.
//!
//! One mutex guards all tables, so multi-entity operations (`insert_order`,
//! `complete_order`) are naturally atomic: either the whole mutation happens
//! under the lock or an error is returned before anything was touched.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockroom_core::{DomainError, ShopId};
use stockroom_products::{Product, ProductId};
use stockroom_restocking::{RestockingOrder, RestockingOrderId};
use stockroom_suppliers::{Supplier, SupplierId};

use super::{OrderFilter, OrderStore, ProductStore, StoreError, SupplierStore};

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<(ShopId, ProductId), Product>,
    suppliers: HashMap<(ShopId, SupplierId), Supplier>,
    orders: HashMap<(ShopId, RestockingOrderId), RestockingOrder>,
}

/// In-memory implementation of all three store traits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (product.shop_id, product.id);
        if inner.products.contains_key(&key) {
            return Err(DomainError::conflict(format!("product {} already exists", product.id)).into());
        }
        inner.products.insert(key, product);
        Ok(())
    }

    async fn get_product(&self, shop_id: ShopId, id: ProductId) -> Result<Product, StoreError> {
        let inner = self.lock()?;
        inner
            .products
            .get(&(shop_id, id))
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
    }

    async fn list_products(&self, shop_id: ShopId) -> Result<Vec<Product>, StoreError> {
        let inner = self.lock()?;
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| p.shop_id == shop_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(products)
    }

    async fn delete_product(&self, shop_id: ShopId, id: ProductId) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .products
            .remove(&(shop_id, id))
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
    }

    async fn adjust_quantity(
        &self,
        shop_id: ShopId,
        id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut inner = self.lock()?;
        let product = inner
            .products
            .get_mut(&(shop_id, id))
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;

        let new_quantity = apply_delta(product.quantity, delta, id)?;
        product.quantity = new_quantity;
        product.updated_at = Utc::now();
        Ok(new_quantity)
    }
}

#[async_trait]
impl SupplierStore for InMemoryStore {
    async fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (supplier.shop_id, supplier.id);
        if inner.suppliers.contains_key(&key) {
            return Err(
                DomainError::conflict(format!("supplier {} already exists", supplier.id)).into(),
            );
        }
        inner.suppliers.insert(key, supplier);
        Ok(())
    }

    async fn supplier_exists(&self, shop_id: ShopId, id: SupplierId) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(inner.suppliers.contains_key(&(shop_id, id)))
    }

    async fn list_suppliers(&self, shop_id: ShopId) -> Result<Vec<Supplier>, StoreError> {
        let inner = self.lock()?;
        let mut suppliers: Vec<Supplier> = inner
            .suppliers
            .values()
            .filter(|s| s.shop_id == shop_id)
            .cloned()
            .collect();
        suppliers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(suppliers)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &RestockingOrder) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (order.shop_id(), order.id_typed());
        if inner.orders.contains_key(&key) {
            return Err(
                DomainError::conflict(format!("order {} already exists", order.id_typed())).into(),
            );
        }
        inner.orders.insert(key, order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &RestockingOrder) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (order.shop_id(), order.id_typed());
        let stored = inner
            .orders
            .get_mut(&key)
            .ok_or_else(|| DomainError::not_found(format!("order {}", order.id_typed())))?;

        // Writers race against transitions; the stored status is authoritative.
        stored.ensure_editable()?;
        // Optimistic concurrency: the write must be based on the stored
        // version, otherwise it would discard an interleaved edit.
        if order.version() != stored.version() + 1 {
            return Err(DomainError::conflict(format!(
                "order {} was modified concurrently",
                order.id_typed()
            ))
            .into());
        }
        *stored = order.clone();
        Ok(())
    }

    async fn get_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
    ) -> Result<RestockingOrder, StoreError> {
        let inner = self.lock()?;
        inner
            .orders
            .get(&(shop_id, id))
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("order {id}")).into())
    }

    async fn list_orders(
        &self,
        shop_id: ShopId,
        filter: OrderFilter,
    ) -> Result<Vec<RestockingOrder>, StoreError> {
        let inner = self.lock()?;
        let mut orders: Vec<RestockingOrder> = inner
            .orders
            .values()
            .filter(|o| o.shop_id() == shop_id)
            .filter(|o| filter.status.is_none_or(|s| o.status() == s))
            .filter(|o| {
                filter
                    .supplier_id
                    .is_none_or(|sid| o.supplier_id() == Some(sid))
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn delete_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let stored = inner
            .orders
            .get(&(shop_id, id))
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
        stored.ensure_deletable()?;
        inner.orders.remove(&(shop_id, id));
        Ok(())
    }

    async fn complete_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        now: DateTime<Utc>,
    ) -> Result<RestockingOrder, StoreError> {
        let mut inner = self.lock()?;
        let order = inner
            .orders
            .get(&(shop_id, id))
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;

        // Status re-check and delta derivation happen under the lock, so a
        // concurrent completion or line edit cannot slip in between.
        let deltas = order.complete_deltas()?;

        // Validate every delta before applying any: all-or-nothing.
        let mut new_quantities = Vec::with_capacity(deltas.len());
        for d in &deltas {
            let product = inner
                .products
                .get(&(shop_id, d.product_id))
                .ok_or_else(|| DomainError::not_found(format!("product {}", d.product_id)))?;
            let new_quantity = apply_delta(product.quantity, d.delta, d.product_id)?;
            new_quantities.push((d.product_id, new_quantity));
        }

        for (product_id, new_quantity) in new_quantities {
            if let Some(product) = inner.products.get_mut(&(shop_id, product_id)) {
                product.quantity = new_quantity;
                product.updated_at = now;
            }
        }

        let order = inner
            .orders
            .get_mut(&(shop_id, id))
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
        order.mark_completed(now);
        Ok(order.clone())
    }

    async fn cancel_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        now: DateTime<Utc>,
    ) -> Result<RestockingOrder, StoreError> {
        let mut inner = self.lock()?;
        let order = inner
            .orders
            .get_mut(&(shop_id, id))
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
        order.ensure_cancellable()?;
        order.mark_cancelled(now);
        Ok(order.clone())
    }
}

fn apply_delta(quantity: i64, delta: i64, id: ProductId) -> Result<i64, StoreError> {
    let new_quantity = quantity
        .checked_add(delta)
        .ok_or_else(|| DomainError::validation("quantity overflow"))?;
    if new_quantity < 0 {
        return Err(DomainError::insufficient_stock(format!(
            "product {id}: on hand {quantity}, delta {delta}"
        ))
        .into());
    }
    Ok(new_quantity)
}
