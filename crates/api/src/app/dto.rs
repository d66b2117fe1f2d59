use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use stockroom_core::Money;
use stockroom_products::{Product, ProductId};
use stockroom_restocking::{LineInput, RestockingOrder, RestockingOrderId};
use stockroom_suppliers::{Supplier, SupplierId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub name: String,
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub supplier_id: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineRequest>,
}

/// Omitting a field leaves it untouched; sending an explicit `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub supplier_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Wraps a present field (even `null`) in `Some` so absent and `null` stay
/// distinguishable after deserialization.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: i64,
    pub unit_cost: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub supplier_id: Option<String>,
}

// -------------------------
// Path/ID parsing
// -------------------------

pub fn parse_order_id(s: &str) -> Result<RestockingOrderId, axum::response::Response> {
    s.parse()
        .map(RestockingOrderId::new)
        .map_err(invalid_id_response)
}

pub fn parse_product_id(s: &str) -> Result<ProductId, axum::response::Response> {
    s.parse().map(ProductId::new).map_err(invalid_id_response)
}

pub fn parse_supplier_id(s: &str) -> Result<SupplierId, axum::response::Response> {
    s.parse().map(SupplierId::new).map_err(invalid_id_response)
}

fn invalid_id_response(err: stockroom_core::DomainError) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", err.to_string())
}

pub fn line_input(line: OrderLineRequest) -> Result<LineInput, axum::response::Response> {
    Ok(LineInput {
        product_id: parse_product_id(&line.product_id)?,
        quantity: line.quantity,
        unit_cost: Money::from_minor(line.unit_cost),
    })
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(product: &Product) -> Value {
    json!({
        "id": product.id.to_string(),
        "name": product.name,
        "quantity": product.quantity,
        "min_quantity": product.min_quantity,
        "below_min": product.is_below_min(),
        "created_at": product.created_at,
        "updated_at": product.updated_at,
    })
}

pub fn supplier_to_json(supplier: &Supplier) -> Value {
    json!({
        "id": supplier.id.to_string(),
        "name": supplier.name,
        "contact": supplier.contact,
        "created_at": supplier.created_at,
    })
}

pub fn order_to_json(order: &RestockingOrder) -> Value {
    let lines: Vec<Value> = order
        .items()
        .lines()
        .iter()
        .map(|item| {
            json!({
                "product_id": item.product_id.to_string(),
                "quantity": item.quantity,
                "unit_cost": item.unit_cost.minor_units(),
                "line_total": item.total_cost().map(|m| m.minor_units()).unwrap_or_default(),
            })
        })
        .collect();

    // Stored orders are re-validated on every mutation, so the total is
    // always representable.
    let total = order.total_amount().unwrap_or(Money::ZERO);

    json!({
        "id": order.id_typed().to_string(),
        "reference_number": order.reference_number(),
        "supplier_id": order.supplier_id().map(|s| s.to_string()),
        "status": order.status().as_str(),
        "notes": order.notes(),
        "lines": lines,
        "total_amount": total.minor_units(),
        "total_amount_display": total.to_string(),
        "created_at": order.created_at(),
        "updated_at": order.updated_at(),
    })
}
