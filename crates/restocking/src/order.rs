use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, EntityId, Money, ShopId};
use stockroom_products::ProductId;
use stockroom_suppliers::SupplierId;

use crate::item_set::{LineInput, RestockingItemSet, StockDelta};

/// Restocking order identifier (shop-scoped via `shop_id` on the entity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestockingOrderId(pub EntityId);

impl RestockingOrderId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RestockingOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Restocking order status lifecycle.
///
/// One-way: `Pending` is the only initial state, `Completed` and `Cancelled`
/// are terminal. There is no path back out of a terminal state; reversing a
/// wrongly completed order would be a compensating business operation, which
/// this engine deliberately does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a restocking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub supplier_id: Option<SupplierId>,
    pub notes: Option<String>,
    pub lines: Vec<LineInput>,
}

/// Entity: RestockingOrder.
///
/// Header and items are mutable only while `Pending`. `total_amount` is always
/// derived from the item set, never tracked separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockingOrder {
    id: RestockingOrderId,
    shop_id: ShopId,
    reference_number: String,
    supplier_id: Option<SupplierId>,
    status: OrderStatus,
    notes: Option<String>,
    items: RestockingItemSet,
    /// Bumped on every header or line edit. Stores compare it on write so a
    /// stale copy of the order cannot silently overwrite a newer one.
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RestockingOrder {
    /// Create a draft order. Fails with `EmptyOrder` when no lines are given;
    /// line validation and duplicate rejection are delegated to the item set.
    pub fn create(
        id: RestockingOrderId,
        shop_id: ShopId,
        input: NewOrder,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.lines.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        let items = RestockingItemSet::from_inputs(input.lines)?;

        Ok(Self {
            id,
            shop_id,
            reference_number: reference_number_for(id),
            supplier_id: input.supplier_id,
            status: OrderStatus::Pending,
            notes: input.notes,
            items,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a persisted order. Used by stores; not a validation path.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RestockingOrderId,
        shop_id: ShopId,
        reference_number: String,
        supplier_id: Option<SupplierId>,
        status: OrderStatus,
        notes: Option<String>,
        items: RestockingItemSet,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            shop_id,
            reference_number,
            supplier_id,
            status,
            notes,
            items,
            version,
            created_at,
            updated_at,
        }
    }

    pub fn id_typed(&self) -> RestockingOrderId {
        self.id
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    pub fn reference_number(&self) -> &str {
        &self.reference_number
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn items(&self) -> &RestockingItemSet {
        &self.items
    }

    pub fn total_amount(&self) -> DomainResult<Money> {
        self.items.total()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Header and items are editable iff the order is still pending.
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::not_editable(self.status.as_str()));
        }
        Ok(())
    }

    /// Orders can only be deleted while pending; completed orders have already
    /// moved stock and cancelled ones are retained for audit reads.
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        self.ensure_editable()
    }

    /// Patch the mutable header fields. The outer `Option` distinguishes
    /// "leave as is" (`None`) from an explicit new value, so `Some(None)`
    /// clears the supplier or notes.
    pub fn update_header(
        &mut self,
        supplier_id: Option<Option<SupplierId>>,
        notes: Option<Option<String>>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_editable()?;
        if let Some(supplier_id) = supplier_id {
            self.supplier_id = supplier_id;
        }
        if let Some(notes) = notes {
            self.notes = notes;
        }
        self.touch(now);
        Ok(())
    }

    pub fn add_line(&mut self, input: LineInput, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.items.add_line(input)?;
        self.touch(now);
        Ok(())
    }

    pub fn update_line(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        unit_cost: Money,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_editable()?;
        self.items.update_line(product_id, quantity, unit_cost)?;
        self.touch(now);
        Ok(())
    }

    pub fn remove_line(&mut self, product_id: ProductId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.items.remove_line(product_id)?;
        self.touch(now);
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    /// Decision step for `pending → completed`: validates the transition and
    /// returns the deltas to apply, without mutating state. The store applies
    /// the deltas and the status flip atomically, then `mark_completed`
    /// evolves the in-memory entity.
    pub fn complete_deltas(&self) -> DomainResult<Vec<StockDelta>> {
        match self.status {
            OrderStatus::Completed => Err(DomainError::AlreadyCompleted),
            OrderStatus::Cancelled => Err(DomainError::not_editable("cancelled")),
            OrderStatus::Pending => {
                if self.items.is_empty() {
                    return Err(DomainError::EmptyOrder);
                }
                Ok(self.items.stock_deltas())
            }
        }
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = OrderStatus::Completed;
        self.updated_at = now;
    }

    /// Decision step for `pending → cancelled`. Cancellation never touches the
    /// ledger; items stay attached for audit reads but become immutable.
    pub fn ensure_cancellable(&self) -> DomainResult<()> {
        match self.status {
            OrderStatus::Completed => Err(DomainError::AlreadyCompleted),
            OrderStatus::Cancelled => Err(DomainError::not_editable("cancelled")),
            OrderStatus::Pending => Ok(()),
        }
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
    }
}

impl Entity for RestockingOrder {
    type Id = RestockingOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Reference numbers are derived from the order's UUIDv7: unique, immutable,
/// and roughly creation-ordered.
fn reference_number_for(id: RestockingOrderId) -> String {
    format!("RST-{}", id.0.as_uuid().simple()).to_uppercase()
}
