use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_products::NewProduct;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ShopContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product).delete(delete_product))
        .route("/:id/adjust", post(adjust_stock))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let input = NewProduct {
        name: body.name,
        quantity: body.quantity,
        min_quantity: body.min_quantity,
    };

    match services.catalog.create_product(shop.shop_id(), input).await {
        Ok(product) => {
            (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_product_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.catalog.get_product(shop.shop_id(), id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
) -> axum::response::Response {
    match services.catalog.list_products(shop.shop_id()).await {
        Ok(products) => {
            let items: Vec<_> = products.iter().map(dto::product_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_product_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.catalog.delete_product(shop.shop_id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Direct stock adjustment (sales, shrinkage, manual corrections).
pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let id = match dto::parse_product_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services
        .ledger
        .adjust_quantity(shop.shop_id(), id, body.delta)
        .await
    {
        Ok(quantity) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id.to_string(), "quantity": quantity })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
