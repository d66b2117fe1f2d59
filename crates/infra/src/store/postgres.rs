//! Postgres-backed store implementation.
//!
//! Atomicity mapping:
//! - `adjust_quantity` is one conditional `UPDATE ... WHERE quantity + delta >= 0`;
//! - `insert_order`/`update_order` write header + items in one transaction;
//! - `complete_order` takes a `FOR UPDATE` lock on the order row (per-order
//!   serialization), applies every delta conditionally, and flips the status
//!   in the same transaction, so "marked completed" and "deltas applied"
//!   cannot disagree after a crash.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use async_trait::async_trait;

use stockroom_core::{DomainError, EntityId, Money, ShopId};
use stockroom_products::{Product, ProductId};
use stockroom_restocking::{
    OrderStatus, RestockingItem, RestockingItemId, RestockingItemSet, RestockingOrder,
    RestockingOrderId,
};
use stockroom_suppliers::{Supplier, SupplierId};

use super::{OrderFilter, OrderStore, ProductStore, StoreError, SupplierStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Postgres implementation of all three store traits.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    shop_id: Uuid,
    name: String,
    quantity: i64,
    min_quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(EntityId::from_uuid(row.id)),
            shop_id: ShopId::from_uuid(row.shop_id),
            name: row.name,
            quantity: row.quantity,
            min_quantity: row.min_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    shop_id: Uuid,
    name: String,
    contact: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: SupplierId::new(EntityId::from_uuid(row.id)),
            shop_id: ShopId::from_uuid(row.shop_id),
            name: row.name,
            contact: row.contact,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    shop_id: Uuid,
    reference_number: String,
    supplier_id: Option<Uuid>,
    status: String,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i64,
    unit_cost_minor: i64,
}

impl From<ItemRow> for RestockingItem {
    fn from(row: ItemRow) -> Self {
        RestockingItem {
            id: RestockingItemId::new(EntityId::from_uuid(row.id)),
            product_id: ProductId::new(EntityId::from_uuid(row.product_id)),
            quantity: row.quantity,
            unit_cost: Money::from_minor(row.unit_cost_minor),
        }
    }
}

fn status_from_str(s: &str) -> Result<OrderStatus, StoreError> {
    match s {
        "pending" => Ok(OrderStatus::Pending),
        "completed" => Ok(OrderStatus::Completed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(StoreError::Backend(format!("unknown order status {other:?}"))),
    }
}

fn rehydrate(row: OrderRow, items: Vec<RestockingItem>) -> Result<RestockingOrder, StoreError> {
    let status = status_from_str(&row.status)?;
    Ok(RestockingOrder::from_parts(
        RestockingOrderId::new(EntityId::from_uuid(row.id)),
        ShopId::from_uuid(row.shop_id),
        row.reference_number,
        row.supplier_id
            .map(|id| SupplierId::new(EntityId::from_uuid(id))),
        status,
        row.notes,
        RestockingItemSet::from_items(items),
        row.version,
        row.created_at,
        row.updated_at,
    ))
}

const SELECT_ORDER: &str = "SELECT id, shop_id, reference_number, supplier_id, status, notes, \
                            version, created_at, updated_at FROM restocking_orders";

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    items: &[RestockingItem],
) -> Result<(), StoreError> {
    for item in items {
        sqlx::query(
            "INSERT INTO restocking_items (id, order_id, product_id, quantity, unit_cost_minor) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(item.id.0.as_uuid())
        .bind(order_id)
        .bind(item.product_id.0.as_uuid())
        .bind(item.quantity)
        .bind(item.unit_cost.minor_units())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Apply one delta with the conditional-update primitive inside `tx`.
/// Distinguishes "product missing" from "would go negative" when nothing
/// matched so the caller can report the offending item precisely.
async fn adjust_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    shop_id: ShopId,
    product_id: ProductId,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let new_quantity: Option<i64> = sqlx::query_scalar(
        "UPDATE products SET quantity = quantity + $3, updated_at = $4 \
         WHERE shop_id = $1 AND id = $2 AND quantity + $3 >= 0 \
         RETURNING quantity",
    )
    .bind(shop_id.as_uuid())
    .bind(product_id.0.as_uuid())
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(q) = new_quantity {
        return Ok(q);
    }

    let on_hand: Option<i64> =
        sqlx::query_scalar("SELECT quantity FROM products WHERE shop_id = $1 AND id = $2")
            .bind(shop_id.as_uuid())
            .bind(product_id.0.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

    match on_hand {
        None => Err(DomainError::not_found(format!("product {product_id}")).into()),
        Some(q) => Err(DomainError::insufficient_stock(format!(
            "product {product_id}: on hand {q}, delta {delta}"
        ))
        .into()),
    }
}

async fn load_items_for(pool: &PgPool, order_id: Uuid) -> Result<Vec<RestockingItem>, StoreError> {
    let rows = sqlx::query_as::<_, ItemRow>(
        "SELECT id, product_id, quantity, unit_cost_minor \
         FROM restocking_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(RestockingItem::from).collect())
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO products (id, shop_id, name, quantity, min_quantity, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(product.id.0.as_uuid())
        .bind(product.shop_id.as_uuid())
        .bind(&product.name)
        .bind(product.quantity)
        .bind(product.min_quantity)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(&self, shop_id: ShopId, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, shop_id, name, quantity, min_quantity, created_at, updated_at \
             FROM products WHERE shop_id = $1 AND id = $2",
        )
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        Ok(row.into())
    }

    async fn list_products(&self, shop_id: ShopId) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, shop_id, name, quantity, min_quantity, created_at, updated_at \
             FROM products WHERE shop_id = $1 ORDER BY created_at",
        )
        .bind(shop_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn delete_product(&self, shop_id: ShopId, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE shop_id = $1 AND id = $2")
            .bind(shop_id.as_uuid())
            .bind(id.0.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("product {id}")).into());
        }
        Ok(())
    }

    async fn adjust_quantity(
        &self,
        shop_id: ShopId,
        id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let new_quantity = adjust_in_tx(&mut tx, shop_id, id, delta, Utc::now()).await?;
        tx.commit().await?;
        Ok(new_quantity)
    }
}

#[async_trait]
impl SupplierStore for PostgresStore {
    async fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO suppliers (id, shop_id, name, contact, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(supplier.id.0.as_uuid())
        .bind(supplier.shop_id.as_uuid())
        .bind(&supplier.name)
        .bind(&supplier.contact)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn supplier_exists(&self, shop_id: ShopId, id: SupplierId) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE shop_id = $1 AND id = $2)",
        )
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_suppliers(&self, shop_id: ShopId) -> Result<Vec<Supplier>, StoreError> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, shop_id, name, contact, created_at \
             FROM suppliers WHERE shop_id = $1 ORDER BY created_at",
        )
        .bind(shop_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Supplier::from).collect())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &RestockingOrder) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO restocking_orders \
             (id, shop_id, reference_number, supplier_id, status, notes, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order.id_typed().0.as_uuid())
        .bind(order.shop_id().as_uuid())
        .bind(order.reference_number())
        .bind(order.supplier_id().map(|s| *s.0.as_uuid()))
        .bind(order.status().as_str())
        .bind(order.notes())
        .bind(order.version())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, *order.id_typed().0.as_uuid(), order.items().lines()).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_order(&self, order: &RestockingOrder) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let order_uuid = *order.id_typed().0.as_uuid();

        // The version predicate is the optimistic lock: a write based on a
        // stale read matches nothing and surfaces as a conflict instead of
        // silently discarding the interleaved edit.
        let result = sqlx::query(
            "UPDATE restocking_orders \
             SET supplier_id = $3, notes = $4, version = $5, updated_at = $6 \
             WHERE shop_id = $1 AND id = $2 AND status = 'pending' AND version = $7",
        )
        .bind(order.shop_id().as_uuid())
        .bind(order_uuid)
        .bind(order.supplier_id().map(|s| *s.0.as_uuid()))
        .bind(order.notes())
        .bind(order.version())
        .bind(order.updated_at())
        .bind(order.version() - 1)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let status: Option<String> = sqlx::query_scalar(
                "SELECT status FROM restocking_orders WHERE shop_id = $1 AND id = $2",
            )
            .bind(order.shop_id().as_uuid())
            .bind(order_uuid)
            .fetch_optional(&mut *tx)
            .await?;
            return Err(match status.as_deref() {
                None => DomainError::not_found(format!("order {}", order.id_typed())).into(),
                Some("pending") => DomainError::conflict(format!(
                    "order {} was modified concurrently",
                    order.id_typed()
                ))
                .into(),
                Some(s) => DomainError::not_editable(s).into(),
            });
        }

        sqlx::query("DELETE FROM restocking_items WHERE order_id = $1")
            .bind(order_uuid)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, order_uuid, order.items().lines()).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
    ) -> Result<RestockingOrder, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE shop_id = $1 AND id = $2"
        ))
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;

        let items = load_items_for(&self.pool, row.id).await?;
        rehydrate(row, items)
    }

    async fn list_orders(
        &self,
        shop_id: ShopId,
        filter: OrderFilter,
    ) -> Result<Vec<RestockingOrder>, StoreError> {
        let mut sql = format!("{SELECT_ORDER} WHERE shop_id = $1");
        if filter.status.is_some() {
            sql.push_str(" AND status = $2");
        }
        if filter.supplier_id.is_some() {
            sql.push_str(if filter.status.is_some() {
                " AND supplier_id = $3"
            } else {
                " AND supplier_id = $2"
            });
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, OrderRow>(&sql).bind(shop_id.as_uuid());
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.bind(*supplier_id.0.as_uuid());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = load_items_for(&self.pool, row.id).await?;
            orders.push(rehydrate(row, items)?);
        }
        Ok(orders)
    }

    async fn delete_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
    ) -> Result<(), StoreError> {
        // Items cascade with the order row.
        let result = sqlx::query(
            "DELETE FROM restocking_orders WHERE shop_id = $1 AND id = $2 AND status = 'pending'",
        )
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let status: Option<String> = sqlx::query_scalar(
                "SELECT status FROM restocking_orders WHERE shop_id = $1 AND id = $2",
            )
            .bind(shop_id.as_uuid())
            .bind(id.0.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
            return Err(match status {
                None => DomainError::not_found(format!("order {id}")).into(),
                Some(s) => DomainError::not_editable(s).into(),
            });
        }
        Ok(())
    }

    async fn complete_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        now: DateTime<Utc>,
    ) -> Result<RestockingOrder, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent transitions on the same order.
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE shop_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;

        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT id, product_id, quantity, unit_cost_minor \
             FROM restocking_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(RestockingItem::from)
        .collect();

        let mut order = rehydrate(row, items)?;
        let deltas = order.complete_deltas()?;

        // Any failing adjustment aborts the transaction: nothing is applied
        // and the status stays pending.
        for d in &deltas {
            adjust_in_tx(&mut tx, shop_id, d.product_id, d.delta, now).await?;
        }

        sqlx::query(
            "UPDATE restocking_orders SET status = 'completed', updated_at = $3 \
             WHERE shop_id = $1 AND id = $2",
        )
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        order.mark_completed(now);
        Ok(order)
    }

    async fn cancel_order(
        &self,
        shop_id: ShopId,
        id: RestockingOrderId,
        now: DateTime<Utc>,
    ) -> Result<RestockingOrder, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE shop_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;

        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT id, product_id, quantity, unit_cost_minor \
             FROM restocking_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(RestockingItem::from)
        .collect();

        let mut order = rehydrate(row, items)?;
        order.ensure_cancellable()?;

        sqlx::query(
            "UPDATE restocking_orders SET status = 'cancelled', updated_at = $3 \
             WHERE shop_id = $1 AND id = $2",
        )
        .bind(shop_id.as_uuid())
        .bind(id.0.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        order.mark_cancelled(now);
        Ok(order)
    }
}
