use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::Money;
use stockroom_restocking::{NewOrder, OrderStatus};
use stockroom_infra::{OrderFilter, OrderPatch, TransitionTarget};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ShopContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route(
            "/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/:id/complete", post(complete_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/lines", post(add_line))
        .route(
            "/:id/lines/:product_id",
            axum::routing::patch(update_line).delete(remove_line),
        )
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let supplier_id = match body.supplier_id.as_deref().map(dto::parse_supplier_id) {
        Some(Ok(id)) => Some(id),
        Some(Err(response)) => return response,
        None => None,
    };

    let mut lines = Vec::with_capacity(body.lines.len());
    for line in body.lines {
        match dto::line_input(line) {
            Ok(input) => lines.push(input),
            Err(response) => return response,
        }
    }

    let input = NewOrder {
        supplier_id,
        notes: body.notes,
        lines,
    };

    match services.restocking.create_order(shop.shop_id(), input).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.restocking.get_order(shop.shop_id(), id).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Query(query): Query<dto::ListOrdersQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref().map(parse_order_status) {
        Some(Ok(status)) => Some(status),
        Some(Err(response)) => return response,
        None => None,
    };
    let supplier_id = match query.supplier_id.as_deref().map(dto::parse_supplier_id) {
        Some(Ok(id)) => Some(id),
        Some(Err(response)) => return response,
        None => None,
    };

    let filter = OrderFilter {
        status,
        supplier_id,
    };
    match services.restocking.list_orders(shop.shop_id(), filter).await {
        Ok(orders) => {
            let items: Vec<_> = orders.iter().map(dto::order_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderRequest>,
) -> axum::response::Response {
    let id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    // Absent field: leave untouched. Explicit null: clear.
    let supplier_id = match body.supplier_id {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => match dto::parse_supplier_id(&raw) {
            Ok(id) => Some(Some(id)),
            Err(response) => return response,
        },
    };

    let patch = OrderPatch {
        supplier_id,
        notes: body.notes,
    };
    match services
        .restocking
        .update_order(shop.shop_id(), id, patch)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.restocking.delete_order(shop.shop_id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// `pending → completed`: receives stock for every line, atomically.
pub async fn complete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, shop, id, TransitionTarget::Completed).await
}

/// `pending → cancelled`: terminal, never touches stock.
pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, shop, id, TransitionTarget::Cancelled).await
}

async fn transition(
    services: Arc<AppServices>,
    shop: ShopContext,
    id: String,
    target: TransitionTarget,
) -> axum::response::Response {
    let id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services
        .restocking
        .transition_order(shop.shop_id(), id, target)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn add_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::OrderLineRequest>,
) -> axum::response::Response {
    let id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let input = match dto::line_input(body) {
        Ok(input) => input,
        Err(response) => return response,
    };

    match services.restocking.add_line(shop.shop_id(), id, input).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn update_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path((id, product_id)): Path<(String, String)>,
    Json(body): Json<dto::UpdateLineRequest>,
) -> axum::response::Response {
    let id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services
        .restocking
        .update_line(
            shop.shop_id(),
            id,
            product_id,
            body.quantity,
            Money::from_minor(body.unit_cost),
        )
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn remove_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path((id, product_id)): Path<(String, String)>,
) -> axum::response::Response {
    let id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services
        .restocking
        .remove_line(shop.shop_id(), id, product_id)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

fn parse_order_status(s: &str) -> Result<OrderStatus, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "completed" => Ok(OrderStatus::Completed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        _ => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending, completed, cancelled",
        )),
    }
}
