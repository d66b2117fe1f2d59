use axum::Router;

pub mod orders;
pub mod products;
pub mod suppliers;
pub mod system;

/// Router for all shop-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/suppliers", suppliers::router())
        .nest("/restocking/orders", orders::router())
}
