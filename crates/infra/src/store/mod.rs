//! Storage abstractions for products, suppliers, and restocking orders.
//!
//! Two implementations exist: an in-memory store (tests, dev, default app
//! wiring) and a Postgres store (durable backend). Both provide the same
//! atomicity guarantees:
//!
//! - `adjust_quantity` is a single conditional update — no caller ever
//!   read-modify-writes a quantity from application memory;
//! - `insert_order` persists header + items as one unit (no orphan headers);
//! - `complete_order` applies every stock delta **and** the status flip
//!   atomically, re-validating the order's status inside the same lock or
//!   transaction so two concurrent completions cannot both win.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_core::{DomainError, ShopId};
use stockroom_products::{Product, ProductId};
use stockroom_restocking::{OrderStatus, RestockingOrder, RestockingOrderId};
use stockroom_suppliers::{Supplier, SupplierId};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Storage operation error.
///
/// Domain failures detected at the atomic boundary (stale status, missing
/// product, insufficient stock) travel as `Domain`; everything else is an
/// opaque backend failure. Backend failures guarantee no partial writes, so
/// retrying the whole operation is always valid.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Backend(value.to_string())
    }
}

/// Filter for order listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub supplier_id: Option<SupplierId>,
}

/// Durable product storage. `adjust_quantity` is the ledger's primitive and
/// the only quantity mutation path.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: Product) -> Result<(), StoreError>;

    async fn get_product(&self, shop_id: ShopId, id: ProductId) -> Result<Product, StoreError>;

    async fn list_products(&self, shop_id: ShopId) -> Result<Vec<Product>, StoreError>;

    async fn delete_product(&self, shop_id: ShopId, id: ProductId) -> Result<(), StoreError>;

    /// Atomically apply `delta` to the product's quantity and return the new
    /// value. Fails with `NotFound` if the product does not exist and with
    /// `InsufficientStock` if the result would be negative; in both cases the
    /// quantity is left unchanged.
    async fn adjust_quantity(
        &self,
        shop_id: ShopId,
        id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError>;
}

/// Durable supplier storage; the engine only needs existence checks.
#[async_trait]
pub trait SupplierStore: Send + Sync {
    async fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError>;

    async fn supplier_exists(&self, shop_id: ShopId, id: SupplierId) -> Result<bool, StoreError>;

    async fn list_suppliers(&self, shop_id: ShopId) -> Result<Vec<Supplier>, StoreError>;
}

/// Durable restocking order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist header + items as one atomic unit.
    async fn insert_order(&self, order: &RestockingOrder) -> Result<(), StoreError>;

    /// Overwrite a pending order (header + items). Fails with a state error if
    /// the stored order is no longer pending.
    async fn update_order(&self, order: &RestockingOrder) -> Result<(), StoreError>;

    async fn get_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
    ) -> Result<RestockingOrder, StoreError>;

    async fn list_orders(
        &self,
        shop_id: ShopId,
        filter: OrderFilter,
    ) -> Result<Vec<RestockingOrder>, StoreError>;

    /// Delete a pending order and its items.
    async fn delete_order(&self, shop_id: ShopId, id: RestockingOrderId)
    -> Result<(), StoreError>;

    /// The `pending → completed` transition: re-reads the order inside the
    /// atomic boundary, derives its stock deltas, applies every delta with the
    /// conditional-update primitive, and flips the status — all or nothing.
    /// A second call observes the completed status and fails with
    /// `AlreadyCompleted` without touching stock.
    async fn complete_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        now: DateTime<Utc>,
    ) -> Result<RestockingOrder, StoreError>;

    /// The `pending → cancelled` transition: status flip only, no ledger
    /// calls. Items remain readable.
    async fn cancel_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        now: DateTime<Utc>,
    ) -> Result<RestockingOrder, StoreError>;
}
