//! Service wiring: pick a backend, build the services once, share them.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use stockroom_audit::{AuditSink, TracingAuditSink};
use stockroom_infra::{
    CatalogService, InMemoryStore, OrderStore, PostgresStore, ProductStore, RestockingService,
    StockLedger, SupplierStore,
};

/// Shared application services, one instance per process.
pub struct AppServices {
    pub restocking: RestockingService,
    pub catalog: CatalogService,
    pub ledger: StockLedger,
}

impl AppServices {
    /// Wire the services over explicit store handles. Used directly by tests
    /// that want an in-memory backend.
    pub fn new(
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
        suppliers: Arc<dyn SupplierStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            restocking: RestockingService::new(
                orders,
                products.clone(),
                suppliers.clone(),
                audit.clone(),
            ),
            catalog: CatalogService::new(products.clone(), suppliers, audit),
            ledger: StockLedger::new(products),
        }
    }

    /// In-memory backend, used for local development and tests.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let audit = Arc::new(TracingAuditSink::new());
        Self::new(store.clone(), store.clone(), store, audit)
    }
}

/// Build services from the environment: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise.
pub async fn build_services() -> anyhow::Result<AppServices> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = PgPoolOptions::new().max_connections(8).connect(&url).await?;
            let store = PostgresStore::new(pool);
            store.migrate().await?;
            tracing::info!("using postgres backend");

            let store = Arc::new(store);
            let audit = Arc::new(TracingAuditSink::new());
            Ok(AppServices::new(store.clone(), store.clone(), store, audit))
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set; using in-memory backend");
            Ok(AppServices::in_memory())
        }
    }
}
