//! Infrastructure layer: storage backends, the stock ledger, and the
//! restocking lifecycle orchestrator.

pub mod ledger;
pub mod service;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use ledger::StockLedger;
pub use service::{
    CatalogService, EngineError, EngineResult, OrderPatch, RestockingService, TransitionTarget,
};
pub use store::{
    InMemoryStore, OrderFilter, OrderStore, PostgresStore, ProductStore, StoreError, SupplierStore,
};
