//! Application services: orchestration over the stores and the audit sink.
//!
//! Services validate cross-entity references (supplier and product
//! existence), drive the domain entities through their lifecycle, delegate
//! atomicity to the store, and emit audit events after the fact.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use stockroom_audit::{AuditAction, AuditEvent, AuditSink};
use stockroom_core::{DomainError, EntityId, Money, ShopId};
use stockroom_products::{NewProduct, Product, ProductId};
use stockroom_restocking::{LineInput, NewOrder, RestockingOrder, RestockingOrderId};
use stockroom_suppliers::{NewSupplier, Supplier, SupplierId};

use crate::store::{OrderFilter, OrderStore, ProductStore, StoreError, SupplierStore};

/// Errors surfaced by the services.
///
/// Domain failures keep their taxonomy so callers (the HTTP layer, tests)
/// can map them precisely; backend failures collapse to an opaque message.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage failure: {0}")]
    Store(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => EngineError::Domain(domain),
            StoreError::Backend(msg) => EngineError::Store(msg),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Requested terminal state for an order transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionTarget {
    Completed,
    Cancelled,
}

/// Header patch for a pending order. The outer `Option` means "leave the
/// field untouched"; `Some(None)` explicitly clears it.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub supplier_id: Option<Option<SupplierId>>,
    pub notes: Option<Option<String>>,
}

/// Restocking order lifecycle operations.
#[derive(Clone)]
pub struct RestockingService {
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    suppliers: Arc<dyn SupplierStore>,
    audit: Arc<dyn AuditSink>,
}

impl RestockingService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
        suppliers: Arc<dyn SupplierStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            orders,
            products,
            suppliers,
            audit,
        }
    }

    /// Create a pending order. The supplier (when given) and every referenced
    /// product must exist in the shop.
    #[tracing::instrument(skip(self, input), fields(%shop_id))]
    pub async fn create_order(
        &self,
        shop_id: ShopId,
        input: NewOrder,
    ) -> EngineResult<RestockingOrder> {
        self.check_supplier(shop_id, input.supplier_id).await?;
        for line in &input.lines {
            self.products.get_product(shop_id, line.product_id).await?;
        }

        let order = RestockingOrder::create(
            RestockingOrderId::new(EntityId::new()),
            shop_id,
            input,
            Utc::now(),
        )?;
        self.orders.insert_order(&order).await?;
        tracing::info!(order_id = %order.id_typed(), reference = order.reference_number(), "order created");

        self.emit(
            self.order_event(&order, AuditAction::Created, "restocking order created")
                .with_new_data(snapshot(&order)),
        );
        Ok(order)
    }

    pub async fn get_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
    ) -> EngineResult<RestockingOrder> {
        Ok(self.orders.get_order(shop_id, id).await?)
    }

    pub async fn list_orders(
        &self,
        shop_id: ShopId,
        filter: OrderFilter,
    ) -> EngineResult<Vec<RestockingOrder>> {
        Ok(self.orders.list_orders(shop_id, filter).await?)
    }

    /// Patch the header of a pending order.
    #[tracing::instrument(skip(self, patch), fields(%shop_id, %id))]
    pub async fn update_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        patch: OrderPatch,
    ) -> EngineResult<RestockingOrder> {
        self.check_supplier(shop_id, patch.supplier_id.flatten())
            .await?;

        let mut order = self.orders.get_order(shop_id, id).await?;
        let before = snapshot(&order);
        order.update_header(patch.supplier_id, patch.notes, Utc::now())?;
        self.orders.update_order(&order).await?;

        self.emit(
            self.order_event(&order, AuditAction::Updated, "order header updated")
                .with_old_data(before)
                .with_new_data(snapshot(&order)),
        );
        Ok(order)
    }

    #[tracing::instrument(skip(self, input), fields(%shop_id, %id))]
    pub async fn add_line(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        input: LineInput,
    ) -> EngineResult<RestockingOrder> {
        self.products.get_product(shop_id, input.product_id).await?;

        let mut order = self.orders.get_order(shop_id, id).await?;
        let before = snapshot(&order);
        order.add_line(input, Utc::now())?;
        self.orders.update_order(&order).await?;

        self.emit(
            self.order_event(&order, AuditAction::Updated, "order line added")
                .with_old_data(before)
                .with_new_data(snapshot(&order)),
        );
        Ok(order)
    }

    #[tracing::instrument(skip(self), fields(%shop_id, %id, %product_id))]
    pub async fn update_line(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        product_id: ProductId,
        quantity: i64,
        unit_cost: Money,
    ) -> EngineResult<RestockingOrder> {
        let mut order = self.orders.get_order(shop_id, id).await?;
        let before = snapshot(&order);
        order.update_line(product_id, quantity, unit_cost, Utc::now())?;
        self.orders.update_order(&order).await?;

        self.emit(
            self.order_event(&order, AuditAction::Updated, "order line updated")
                .with_old_data(before)
                .with_new_data(snapshot(&order)),
        );
        Ok(order)
    }

    #[tracing::instrument(skip(self), fields(%shop_id, %id, %product_id))]
    pub async fn remove_line(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        product_id: ProductId,
    ) -> EngineResult<RestockingOrder> {
        let mut order = self.orders.get_order(shop_id, id).await?;
        let before = snapshot(&order);
        order.remove_line(product_id, Utc::now())?;
        self.orders.update_order(&order).await?;

        self.emit(
            self.order_event(&order, AuditAction::Updated, "order line removed")
                .with_old_data(before)
                .with_new_data(snapshot(&order)),
        );
        Ok(order)
    }

    /// Drive a pending order to a terminal state.
    ///
    /// Completion applies all stock deltas and the status flip atomically in
    /// the store; cancellation only flips the status. Both paths emit an
    /// audit event after the transition has committed.
    #[tracing::instrument(skip(self), fields(%shop_id, %id, ?target))]
    pub async fn transition_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        target: TransitionTarget,
    ) -> EngineResult<RestockingOrder> {
        let now = Utc::now();
        let (order, action, description) = match target {
            TransitionTarget::Completed => (
                self.orders.complete_order(shop_id, id, now).await?,
                AuditAction::Completed,
                "order completed, stock received",
            ),
            TransitionTarget::Cancelled => (
                self.orders.cancel_order(shop_id, id, now).await?,
                AuditAction::Cancelled,
                "order cancelled, stock untouched",
            ),
        };
        tracing::info!(status = %order.status(), "order transitioned");

        self.emit(
            self.order_event(&order, action, description)
                .with_new_data(snapshot(&order)),
        );
        Ok(order)
    }

    /// Delete a pending order. Terminal orders are retained.
    #[tracing::instrument(skip(self), fields(%shop_id, %id))]
    pub async fn delete_order(&self, shop_id: ShopId, id: RestockingOrderId) -> EngineResult<()> {
        let order = self.orders.get_order(shop_id, id).await?;
        order.ensure_deletable()?;
        self.orders.delete_order(shop_id, id).await?;

        self.emit(
            self.order_event(&order, AuditAction::Deleted, "pending order deleted")
                .with_old_data(snapshot(&order)),
        );
        Ok(())
    }

    async fn check_supplier(
        &self,
        shop_id: ShopId,
        supplier_id: Option<SupplierId>,
    ) -> EngineResult<()> {
        if let Some(supplier_id) = supplier_id {
            if !self.suppliers.supplier_exists(shop_id, supplier_id).await? {
                return Err(DomainError::not_found(format!("supplier {supplier_id}")).into());
            }
        }
        Ok(())
    }

    fn order_event(
        &self,
        order: &RestockingOrder,
        action: AuditAction,
        description: &str,
    ) -> AuditEvent {
        AuditEvent::new(
            order.shop_id(),
            action,
            "restocking_order",
            order.id_typed().to_string(),
            order.reference_number(),
            description,
        )
    }

    fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.record(event) {
            tracing::warn!(%err, "audit event dropped");
        }
    }
}

/// Product and supplier catalog operations.
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    suppliers: Arc<dyn SupplierStore>,
    audit: Arc<dyn AuditSink>,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        suppliers: Arc<dyn SupplierStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            products,
            suppliers,
            audit,
        }
    }

    #[tracing::instrument(skip(self, input), fields(%shop_id))]
    pub async fn create_product(
        &self,
        shop_id: ShopId,
        input: NewProduct,
    ) -> EngineResult<Product> {
        let product = Product::create(
            ProductId::new(EntityId::new()),
            shop_id,
            input,
            Utc::now(),
        )?;
        self.products.insert_product(product.clone()).await?;

        self.emit(
            AuditEvent::new(
                shop_id,
                AuditAction::Created,
                "product",
                product.id.to_string(),
                product.name.clone(),
                "product created",
            )
            .with_new_data(serde_json::to_value(&product).unwrap_or_default()),
        );
        Ok(product)
    }

    pub async fn get_product(&self, shop_id: ShopId, id: ProductId) -> EngineResult<Product> {
        Ok(self.products.get_product(shop_id, id).await?)
    }

    pub async fn list_products(&self, shop_id: ShopId) -> EngineResult<Vec<Product>> {
        Ok(self.products.list_products(shop_id).await?)
    }

    #[tracing::instrument(skip(self), fields(%shop_id, %id))]
    pub async fn delete_product(&self, shop_id: ShopId, id: ProductId) -> EngineResult<()> {
        let product = self.products.get_product(shop_id, id).await?;
        self.products.delete_product(shop_id, id).await?;

        self.emit(
            AuditEvent::new(
                shop_id,
                AuditAction::Deleted,
                "product",
                id.to_string(),
                product.name.clone(),
                "product deleted",
            )
            .with_old_data(serde_json::to_value(&product).unwrap_or_default()),
        );
        Ok(())
    }

    #[tracing::instrument(skip(self, input), fields(%shop_id))]
    pub async fn create_supplier(
        &self,
        shop_id: ShopId,
        input: NewSupplier,
    ) -> EngineResult<Supplier> {
        let supplier = Supplier::create(
            SupplierId::new(EntityId::new()),
            shop_id,
            input,
            Utc::now(),
        )?;
        self.suppliers.insert_supplier(supplier.clone()).await?;

        self.emit(
            AuditEvent::new(
                shop_id,
                AuditAction::Created,
                "supplier",
                supplier.id.to_string(),
                supplier.name.clone(),
                "supplier created",
            )
            .with_new_data(serde_json::to_value(&supplier).unwrap_or_default()),
        );
        Ok(supplier)
    }

    pub async fn list_suppliers(&self, shop_id: ShopId) -> EngineResult<Vec<Supplier>> {
        Ok(self.suppliers.list_suppliers(shop_id).await?)
    }

    fn emit(&self, event: AuditEvent) {
        if let Err(err) = self.audit.record(event) {
            tracing::warn!(%err, "audit event dropped");
        }
    }
}

fn snapshot(order: &RestockingOrder) -> serde_json::Value {
    serde_json::to_value(order).unwrap_or_default()
}
