use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stockroom_core::ShopId;

use crate::context::ShopContext;

const SHOP_HEADER: &str = "x-shop-id";

/// Derive the shop context from the `x-shop-id` header.
///
/// All domain routes are shop-scoped; a missing or malformed header is
/// rejected before any handler runs.
pub async fn shop_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let shop_id = extract_shop_id(req.headers())?;

    req.extensions_mut().insert(ShopContext::new(shop_id));

    Ok(next.run(req).await)
}

fn extract_shop_id(headers: &HeaderMap) -> Result<ShopId, StatusCode> {
    let header = headers
        .get(SHOP_HEADER)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;

    header
        .trim()
        .parse::<ShopId>()
        .map_err(|_| StatusCode::BAD_REQUEST)
}
