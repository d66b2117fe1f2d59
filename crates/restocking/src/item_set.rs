use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, EntityId, Money};
use stockroom_products::ProductId;

/// Restocking item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestockingItemId(pub EntityId);

impl RestockingItemId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RestockingItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Input for one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Money,
}

/// One product entry within an order's item set.
///
/// The line total is always computed from `quantity × unit_cost`; it is never
/// stored, so it cannot drift out of sync with its constituents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockingItem {
    pub id: RestockingItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Money,
}

impl RestockingItem {
    pub fn total_cost(&self) -> DomainResult<Money> {
        self.unit_cost.checked_mul_quantity(self.quantity)
    }
}

/// A signed quantity change for one product, produced by completing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub product_id: ProductId,
    pub delta: i64,
}

/// The staged collection of lines belonging to one order.
///
/// Enforces per-order uniqueness of product lines: a duplicate add is rejected
/// rather than silently merged, so a double-entry mistake in the caller stays
/// visible.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestockingItemSet {
    lines: Vec<RestockingItem>,
}

impl RestockingItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw line inputs, validating each and rejecting
    /// duplicate products.
    pub fn from_inputs(inputs: Vec<LineInput>) -> DomainResult<Self> {
        let mut set = Self::new();
        for input in inputs {
            set.add_line(input)?;
        }
        Ok(set)
    }

    /// Rebuild a set from persisted items. Storage owns the integrity of what
    /// it hands back; no re-validation happens here.
    pub fn from_items(items: Vec<RestockingItem>) -> Self {
        Self { lines: items }
    }

    pub fn lines(&self) -> &[RestockingItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn line_for(&self, product_id: ProductId) -> Option<&RestockingItem> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Add a line for a product not yet on the order.
    pub fn add_line(&mut self, input: LineInput) -> DomainResult<()> {
        validate_line(input.quantity, input.unit_cost)?;
        if self.line_for(input.product_id).is_some() {
            return Err(DomainError::duplicate_line(input.product_id.to_string()));
        }
        let line = RestockingItem {
            id: RestockingItemId::new(EntityId::new()),
            product_id: input.product_id,
            quantity: input.quantity,
            unit_cost: input.unit_cost,
        };
        // Reject up front if the new total would not be representable.
        line.total_cost()?;
        self.lines.push(line);
        if let Err(e) = self.total() {
            self.lines.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Re-price or re-quantify an existing line.
    pub fn update_line(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        unit_cost: Money,
    ) -> DomainResult<()> {
        validate_line(quantity, unit_cost)?;
        let idx = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| DomainError::line_not_found(product_id.to_string()))?;

        let previous = self.lines[idx];
        self.lines[idx].quantity = quantity;
        self.lines[idx].unit_cost = unit_cost;
        if let Err(e) = self.lines[idx].total_cost().and_then(|_| self.total()) {
            self.lines[idx] = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn remove_line(&mut self, product_id: ProductId) -> DomainResult<()> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| DomainError::line_not_found(product_id.to_string()))?;
        self.lines.remove(idx);
        Ok(())
    }

    /// Sum of line totals. This, not a separately tracked running total, is
    /// what callers persist as the order's `total_amount`.
    pub fn total(&self) -> DomainResult<Money> {
        let mut total = Money::ZERO;
        for line in &self.lines {
            total = total.checked_add(line.total_cost()?)?;
        }
        Ok(total)
    }

    /// Positive deltas to apply to products when the order completes.
    pub fn stock_deltas(&self) -> Vec<StockDelta> {
        self.lines
            .iter()
            .map(|l| StockDelta {
                product_id: l.product_id,
                delta: l.quantity,
            })
            .collect()
    }
}

fn validate_line(quantity: i64, unit_cost: Money) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::invalid_line("quantity must be positive"));
    }
    if unit_cost.is_negative() {
        return Err(DomainError::invalid_line("unit cost cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_product_id() -> ProductId {
        ProductId::new(EntityId::new())
    }

    fn line(product_id: ProductId, quantity: i64, unit_cost_minor: i64) -> LineInput {
        LineInput {
            product_id,
            quantity,
            unit_cost: Money::from_minor(unit_cost_minor),
        }
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let mut set = RestockingItemSet::new();
        set.add_line(line(test_product_id(), 10, 1000)).unwrap();
        set.add_line(line(test_product_id(), 3, 250)).unwrap();

        assert_eq!(set.total().unwrap(), Money::from_minor(10_750));
    }

    #[test]
    fn duplicate_product_is_rejected_not_merged() {
        let product_id = test_product_id();
        let mut set = RestockingItemSet::new();
        set.add_line(line(product_id, 10, 1000)).unwrap();

        let err = set.add_line(line(product_id, 5, 1000)).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateLine(_)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.line_for(product_id).unwrap().quantity, 10);
    }

    #[test]
    fn zero_quantity_is_an_invalid_line() {
        let mut set = RestockingItemSet::new();
        let err = set.add_line(line(test_product_id(), 0, 1000)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidLine(_)));
    }

    #[test]
    fn negative_unit_cost_is_an_invalid_line() {
        let mut set = RestockingItemSet::new();
        let err = set.add_line(line(test_product_id(), 1, -1)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidLine(_)));
    }

    #[test]
    fn update_recomputes_the_total() {
        let product_id = test_product_id();
        let mut set = RestockingItemSet::new();
        set.add_line(line(product_id, 10, 1000)).unwrap();

        set.update_line(product_id, 4, Money::from_minor(500)).unwrap();
        assert_eq!(set.total().unwrap(), Money::from_minor(2000));
    }

    #[test]
    fn update_missing_line_fails_with_line_not_found() {
        let mut set = RestockingItemSet::new();
        let err = set
            .update_line(test_product_id(), 1, Money::from_minor(1))
            .unwrap_err();
        assert!(matches!(err, DomainError::LineNotFound(_)));
    }

    #[test]
    fn invalid_update_leaves_the_line_unchanged() {
        let product_id = test_product_id();
        let mut set = RestockingItemSet::new();
        set.add_line(line(product_id, 10, 1000)).unwrap();

        let err = set
            .update_line(product_id, -2, Money::from_minor(1000))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidLine(_)));
        assert_eq!(set.line_for(product_id).unwrap().quantity, 10);
        assert_eq!(set.total().unwrap(), Money::from_minor(10_000));
    }

    #[test]
    fn remove_missing_line_fails_with_line_not_found() {
        let mut set = RestockingItemSet::new();
        let err = set.remove_line(test_product_id()).unwrap_err();
        assert!(matches!(err, DomainError::LineNotFound(_)));
    }

    #[test]
    fn overflowing_line_is_rejected_and_set_stays_intact() {
        let mut set = RestockingItemSet::new();
        set.add_line(line(test_product_id(), 1, 100)).unwrap();

        let err = set
            .add_line(line(test_product_id(), i64::MAX, i64::MAX))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn stock_deltas_mirror_line_quantities() {
        let p1 = test_product_id();
        let p2 = test_product_id();
        let mut set = RestockingItemSet::new();
        set.add_line(line(p1, 10, 1000)).unwrap();
        set.add_line(line(p2, 3, 250)).unwrap();

        let deltas = set.stock_deltas();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0], StockDelta { product_id: p1, delta: 10 });
        assert_eq!(deltas[1], StockDelta { product_id: p2, delta: 3 });
    }

    proptest! {
        /// Total consistency: for any valid line sequence, the set total equals
        /// the sum of the individual line totals.
        #[test]
        fn total_always_equals_sum_of_lines(
            quantities in proptest::collection::vec(1i64..10_000, 1..20),
            costs in proptest::collection::vec(0i64..1_000_000, 20),
        ) {
            let mut set = RestockingItemSet::new();
            let mut expected = 0i64;
            for (q, c) in quantities.iter().zip(costs.iter()) {
                set.add_line(LineInput {
                    product_id: test_product_id(),
                    quantity: *q,
                    unit_cost: Money::from_minor(*c),
                }).unwrap();
                expected += q * c;
            }
            prop_assert_eq!(set.total().unwrap(), Money::from_minor(expected));
        }
    }
}
