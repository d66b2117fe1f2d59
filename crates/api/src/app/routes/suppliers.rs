use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use stockroom_suppliers::NewSupplier;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ShopContext;

pub fn router() -> Router {
    Router::new().route("/", post(create_supplier).get(list_suppliers))
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
    Json(body): Json<dto::CreateSupplierRequest>,
) -> axum::response::Response {
    let input = NewSupplier {
        name: body.name,
        contact: body.contact,
    };

    match services.catalog.create_supplier(shop.shop_id(), input).await {
        Ok(supplier) => {
            (StatusCode::CREATED, Json(dto::supplier_to_json(&supplier))).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(shop): Extension<ShopContext>,
) -> axum::response::Response {
    match services.catalog.list_suppliers(shop.shop_id()).await {
        Ok(suppliers) => {
            let items: Vec<_> = suppliers.iter().map(dto::supplier_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}
