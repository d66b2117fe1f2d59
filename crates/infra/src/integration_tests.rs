//! End-to-end tests over the services and the in-memory store.
//!
//! These focus on the lifecycle guarantees: exactly-once stock application,
//! all-or-nothing completion, terminal-state immutability, and conservation
//! under concurrent writers.

use std::sync::Arc;

use chrono::Utc;

use stockroom_audit::{AuditAction, AuditError, AuditEvent, AuditSink, InMemoryAuditSink};
use stockroom_core::{DomainError, EntityId, Money, ShopId};
use stockroom_products::{NewProduct, Product, ProductId};
use stockroom_restocking::{LineInput, NewOrder, OrderStatus, RestockingOrder, RestockingOrderId};
use stockroom_suppliers::{NewSupplier, Supplier, SupplierId};

use crate::ledger::StockLedger;
use crate::service::{CatalogService, EngineError, OrderPatch, RestockingService, TransitionTarget};
use crate::store::{InMemoryStore, OrderFilter, OrderStore, StoreError};

struct TestEngine {
    shop_id: ShopId,
    restocking: RestockingService,
    catalog: CatalogService,
    ledger: StockLedger,
    audit: Arc<InMemoryAuditSink>,
}

fn engine() -> TestEngine {
    let store = Arc::new(InMemoryStore::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    TestEngine {
        shop_id: ShopId::new(),
        restocking: RestockingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            audit.clone(),
        ),
        catalog: CatalogService::new(store.clone(), store.clone(), audit.clone()),
        ledger: StockLedger::new(store),
        audit,
    }
}

async fn seed_product(engine: &TestEngine, name: &str, quantity: i64) -> Product {
    engine
        .catalog
        .create_product(
            engine.shop_id,
            NewProduct {
                name: name.to_string(),
                quantity,
                min_quantity: 0,
            },
        )
        .await
        .unwrap()
}

async fn seed_supplier(engine: &TestEngine, name: &str) -> Supplier {
    engine
        .catalog
        .create_supplier(
            engine.shop_id,
            NewSupplier {
                name: name.to_string(),
                contact: None,
            },
        )
        .await
        .unwrap()
}

fn line(product_id: ProductId, quantity: i64, unit_cost_minor: i64) -> LineInput {
    LineInput {
        product_id,
        quantity,
        unit_cost: Money::from_minor(unit_cost_minor),
    }
}

async fn pending_order(engine: &TestEngine, lines: Vec<LineInput>) -> RestockingOrder {
    let supplier = seed_supplier(engine, "Acme Wholesale").await;
    engine
        .restocking
        .create_order(
            engine.shop_id,
            NewOrder {
                supplier_id: Some(supplier.id),
                notes: None,
                lines,
            },
        )
        .await
        .unwrap()
}

async fn on_hand(engine: &TestEngine, id: ProductId) -> i64 {
    engine
        .catalog
        .get_product(engine.shop_id, id)
        .await
        .unwrap()
        .quantity
}

#[tokio::test]
async fn completing_an_order_receives_stock_exactly_once() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 3).await;
    let order = pending_order(&engine, vec![line(product.id, 10, 1000)]).await;
    assert_eq!(order.total_amount().unwrap(), Money::from_minor(10_000));

    let completed = engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status(), OrderStatus::Completed);
    assert_eq!(on_hand(&engine, product.id).await, 13);

    // Retrying the transition must not move stock again.
    let err = engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::AlreadyCompleted)
    ));
    assert_eq!(on_hand(&engine, product.id).await, 13);
}

#[tokio::test]
async fn completion_is_all_or_nothing_when_a_product_is_missing() {
    let engine = engine();
    let keep = seed_product(&engine, "Beans", 5).await;
    let doomed = seed_product(&engine, "Filters", 5).await;
    let order = pending_order(
        &engine,
        vec![line(keep.id, 10, 100), line(doomed.id, 4, 100)],
    )
    .await;

    engine
        .catalog
        .delete_product(engine.shop_id, doomed.id)
        .await
        .unwrap();

    let err = engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(DomainError::NotFound(_))));

    // Nothing applied, order still pending and retryable.
    assert_eq!(on_hand(&engine, keep.id).await, 5);
    let reloaded = engine
        .restocking
        .get_order(engine.shop_id, order.id_typed())
        .await
        .unwrap();
    assert_eq!(reloaded.status(), OrderStatus::Pending);
}

#[tokio::test]
async fn ledger_rejects_adjustments_that_would_go_negative() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 2).await;

    let err = engine
        .ledger
        .adjust_quantity(engine.shop_id, product.id, -3)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::InsufficientStock(_))
    ));
    assert_eq!(on_hand(&engine, product.id).await, 2);

    let err = engine
        .ledger
        .adjust_quantity(engine.shop_id, product.id, 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::Validation(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_completion_and_sale_conserve_stock() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 10).await;
    let order = pending_order(&engine, vec![line(product.id, 5, 100)]).await;

    let restocking = engine.restocking.clone();
    let ledger = engine.ledger.clone();
    let shop_id = engine.shop_id;
    let order_id = order.id_typed();
    let product_id = product.id;

    let complete =
        tokio::spawn(
            async move { restocking.transition_order(shop_id, order_id, TransitionTarget::Completed).await },
        );
    let sale =
        tokio::spawn(async move { ledger.adjust_quantity(shop_id, product_id, -3).await });

    complete.await.unwrap().unwrap();
    sale.await.unwrap().unwrap();

    // 10 + 5 - 3, regardless of interleaving.
    assert_eq!(on_hand(&engine, product.id).await, 12);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_completions_have_exactly_one_winner() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;
    let order = pending_order(&engine, vec![line(product.id, 7, 100)]).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let restocking = engine.restocking.clone();
        let shop_id = engine.shop_id;
        let order_id = order.id_typed();
        handles.push(tokio::spawn(async move {
            restocking
                .transition_order(shop_id, order_id, TransitionTarget::Completed)
                .await
        }));
    }

    let mut wins = 0;
    let mut already_completed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(EngineError::Domain(DomainError::AlreadyCompleted)) => already_completed += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(already_completed, 1);
    assert_eq!(on_hand(&engine, product.id).await, 7);
}

#[tokio::test]
async fn completed_orders_reject_edits_and_deletion() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;
    let order = pending_order(&engine, vec![line(product.id, 1, 100)]).await;
    engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap();

    let err = engine
        .restocking
        .update_order(
            engine.shop_id,
            order.id_typed(),
            OrderPatch {
                supplier_id: None,
                notes: Some(Some("too late".to_string())),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::OrderNotEditable(_))
    ));

    let err = engine
        .restocking
        .delete_order(engine.shop_id, order.id_typed())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::OrderNotEditable(_))
    ));
}

#[tokio::test]
async fn cancellation_never_touches_stock() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 4).await;
    let order = pending_order(&engine, vec![line(product.id, 9, 100)]).await;

    let cancelled = engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(on_hand(&engine, product.id).await, 4);

    // Terminal both ways: a cancelled order can never be completed.
    let err = engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(DomainError::OrderNotEditable(_))
    ));
    assert_eq!(on_hand(&engine, product.id).await, 4);
}

#[tokio::test]
async fn completing_after_removing_the_last_line_fails_empty() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;
    let order = pending_order(&engine, vec![line(product.id, 2, 100)]).await;

    engine
        .restocking
        .remove_line(engine.shop_id, order.id_typed(), product.id)
        .await
        .unwrap();

    let err = engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(DomainError::EmptyOrder)));
}

#[tokio::test]
async fn line_edits_flow_through_to_the_stored_order() {
    let engine = engine();
    let p1 = seed_product(&engine, "Beans", 0).await;
    let p2 = seed_product(&engine, "Filters", 0).await;
    let order = pending_order(&engine, vec![line(p1.id, 10, 1000)]).await;

    engine
        .restocking
        .add_line(engine.shop_id, order.id_typed(), line(p2.id, 2, 500))
        .await
        .unwrap();
    engine
        .restocking
        .update_line(
            engine.shop_id,
            order.id_typed(),
            p1.id,
            5,
            Money::from_minor(1000),
        )
        .await
        .unwrap();

    let reloaded = engine
        .restocking
        .get_order(engine.shop_id, order.id_typed())
        .await
        .unwrap();
    assert_eq!(reloaded.items().len(), 2);
    assert_eq!(reloaded.total_amount().unwrap(), Money::from_minor(6_000));

    // Completion uses the edited lines.
    engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap();
    assert_eq!(on_hand(&engine, p1.id).await, 5);
    assert_eq!(on_hand(&engine, p2.id).await, 2);
}

#[tokio::test]
async fn stale_order_copies_cannot_overwrite_newer_edits() {
    let store = Arc::new(InMemoryStore::new());
    let shop_id = ShopId::new();
    let p1 = ProductId::new(EntityId::new());
    let p2 = ProductId::new(EntityId::new());
    let p3 = ProductId::new(EntityId::new());

    let order = RestockingOrder::create(
        RestockingOrderId::new(EntityId::new()),
        shop_id,
        NewOrder {
            supplier_id: None,
            notes: None,
            lines: vec![line(p1, 1, 100)],
        },
        Utc::now(),
    )
    .unwrap();
    store.insert_order(&order).await.unwrap();

    // Two writers each load the one-line order, then race their edits.
    let mut first = store.get_order(shop_id, order.id_typed()).await.unwrap();
    let mut second = store.get_order(shop_id, order.id_typed()).await.unwrap();
    first.add_line(line(p2, 2, 100), Utc::now()).unwrap();
    second.add_line(line(p3, 3, 100), Utc::now()).unwrap();

    store.update_order(&first).await.unwrap();
    let err = store.update_order(&second).await.unwrap_err();
    assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));

    // The first writer's line survived; the loser has to reload and retry.
    let reloaded = store.get_order(shop_id, order.id_typed()).await.unwrap();
    assert_eq!(reloaded.items().len(), 2);
    assert!(reloaded.items().line_for(p2).is_some());

    let mut retried = reloaded;
    retried.add_line(line(p3, 3, 100), Utc::now()).unwrap();
    store.update_order(&retried).await.unwrap();
    let final_order = store.get_order(shop_id, order.id_typed()).await.unwrap();
    assert_eq!(final_order.items().len(), 3);
}

#[tokio::test]
async fn patch_can_clear_supplier_and_notes() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;
    let supplier = seed_supplier(&engine, "Acme Wholesale").await;
    let order = engine
        .restocking
        .create_order(
            engine.shop_id,
            NewOrder {
                supplier_id: Some(supplier.id),
                notes: Some("rush order".to_string()),
                lines: vec![line(product.id, 1, 100)],
            },
        )
        .await
        .unwrap();

    let patched = engine
        .restocking
        .update_order(
            engine.shop_id,
            order.id_typed(),
            OrderPatch {
                supplier_id: Some(None),
                notes: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.supplier_id(), None);
    assert_eq!(patched.notes(), None);

    let reloaded = engine
        .restocking
        .get_order(engine.shop_id, order.id_typed())
        .await
        .unwrap();
    assert_eq!(reloaded.supplier_id(), None);
    assert_eq!(reloaded.notes(), None);
}

#[tokio::test]
async fn create_order_rejects_unknown_references() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;

    let err = engine
        .restocking
        .create_order(
            engine.shop_id,
            NewOrder {
                supplier_id: Some(SupplierId::new(EntityId::new())),
                notes: None,
                lines: vec![line(product.id, 1, 100)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(DomainError::NotFound(_))));

    let err = engine
        .restocking
        .create_order(
            engine.shop_id,
            NewOrder {
                supplier_id: None,
                notes: None,
                lines: vec![line(ProductId::new(EntityId::new()), 1, 100)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(DomainError::NotFound(_))));
}

#[tokio::test]
async fn list_orders_filters_by_status_and_supplier() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;
    let supplier = seed_supplier(&engine, "Acme Wholesale").await;

    let first = engine
        .restocking
        .create_order(
            engine.shop_id,
            NewOrder {
                supplier_id: Some(supplier.id),
                notes: None,
                lines: vec![line(product.id, 1, 100)],
            },
        )
        .await
        .unwrap();
    engine
        .restocking
        .create_order(
            engine.shop_id,
            NewOrder {
                supplier_id: None,
                notes: None,
                lines: vec![line(product.id, 2, 100)],
            },
        )
        .await
        .unwrap();
    engine
        .restocking
        .transition_order(engine.shop_id, first.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap();

    let completed = engine
        .restocking
        .list_orders(
            engine.shop_id,
            OrderFilter {
                status: Some(OrderStatus::Completed),
                supplier_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id_typed(), first.id_typed());

    let by_supplier = engine
        .restocking
        .list_orders(
            engine.shop_id,
            OrderFilter {
                status: None,
                supplier_id: Some(supplier.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(by_supplier.len(), 1);

    let all = engine
        .restocking
        .list_orders(engine.shop_id, OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn orders_are_scoped_to_their_shop() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;
    let order = pending_order(&engine, vec![line(product.id, 1, 100)]).await;

    let other_shop = ShopId::new();
    let err = engine
        .restocking
        .get_order(other_shop, order.id_typed())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(DomainError::NotFound(_))));
}

#[tokio::test]
async fn lifecycle_emits_audit_events() {
    let engine = engine();
    let product = seed_product(&engine, "Beans", 0).await;
    let order = pending_order(&engine, vec![line(product.id, 1, 100)]).await;
    engine
        .restocking
        .transition_order(engine.shop_id, order.id_typed(), TransitionTarget::Completed)
        .await
        .unwrap();

    let actions: Vec<AuditAction> = engine
        .audit
        .events()
        .iter()
        .filter(|e| e.entity_type == "restocking_order")
        .map(|e| e.action_type)
        .collect();
    assert_eq!(actions, vec![AuditAction::Created, AuditAction::Completed]);
}

#[tokio::test]
async fn a_failing_audit_sink_does_not_fail_the_operation() {
    struct FailingSink;

    impl AuditSink for FailingSink {
        fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
            Err(AuditError::new("sink offline"))
        }
    }

    let store = Arc::new(InMemoryStore::new());
    let catalog = CatalogService::new(store.clone(), store.clone(), Arc::new(FailingSink));
    let restocking =
        RestockingService::new(store.clone(), store.clone(), store, Arc::new(FailingSink));

    let shop_id = ShopId::new();
    let product = catalog
        .create_product(
            shop_id,
            NewProduct {
                name: "Beans".to_string(),
                quantity: 0,
                min_quantity: 0,
            },
        )
        .await
        .unwrap();

    let order = restocking
        .create_order(
            shop_id,
            NewOrder {
                supplier_id: None,
                notes: None,
                lines: vec![line(product.id, 1, 100)],
            },
        )
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
}
