use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, EntityId, ShopId};

/// Product identifier (shop-scoped via `shop_id` on the entity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub EntityId);

impl ProductId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub quantity: i64,
    pub min_quantity: i64,
}

/// Entity: Product.
///
/// `quantity` is never mutated directly by callers; every change goes through
/// the stock ledger's atomic adjustment so concurrent writers cannot lose an
/// update. The invariant `quantity >= 0` is enforced there too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub quantity: i64,
    pub min_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(
        id: ProductId,
        shop_id: ShopId,
        input: NewProduct,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if input.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if input.min_quantity < 0 {
            return Err(DomainError::validation("min_quantity cannot be negative"));
        }

        Ok(Self {
            id,
            shop_id,
            name: input.name,
            quantity: input.quantity,
            min_quantity: input.min_quantity,
            created_at: now,
            updated_at: now,
        })
    }

    /// True when on-hand stock has fallen to or below the reorder threshold.
    pub fn is_below_min(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn create_rejects_negative_initial_quantity() {
        let err = Product::create(
            ProductId::new(EntityId::new()),
            ShopId::new(),
            NewProduct {
                name: "Beans".to_string(),
                quantity: -1,
                min_quantity: 0,
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_empty_name() {
        let err = Product::create(
            ProductId::new(EntityId::new()),
            ShopId::new(),
            NewProduct {
                name: "  ".to_string(),
                quantity: 0,
                min_quantity: 0,
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn below_min_compares_against_threshold() {
        let product = Product::create(
            ProductId::new(EntityId::new()),
            ShopId::new(),
            NewProduct {
                name: "Beans".to_string(),
                quantity: 3,
                min_quantity: 5,
            },
            now(),
        )
        .unwrap();
        assert!(product.is_below_min());
    }
}
