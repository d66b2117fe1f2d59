//! Restocking order domain: the item set, the one-way status state machine,
//! and the stock deltas a completed order contributes to the ledger.
//!
//! Everything here is pure — no IO, no clocks of its own. Persistence and the
//! atomic application of deltas live in `stockroom-infra`.

pub mod item_set;
pub mod order;

pub use item_set::{LineInput, RestockingItem, RestockingItemId, RestockingItemSet, StockDelta};
pub use order::{NewOrder, OrderStatus, RestockingOrder, RestockingOrderId};
