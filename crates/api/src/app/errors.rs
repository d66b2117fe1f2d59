use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_core::DomainError;
use stockroom_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::Domain(domain) => domain_error_to_response(domain),
        EngineError::Store(msg) => {
            tracing::error!(%msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) | DomainError::InvalidLine(_) | DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        DomainError::EmptyOrder => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "empty_order", message)
        }
        DomainError::DuplicateLine(_) => json_error(StatusCode::CONFLICT, "duplicate_line", message),
        DomainError::LineNotFound(_) | DomainError::NotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", message)
        }
        DomainError::OrderNotEditable(_) => {
            json_error(StatusCode::CONFLICT, "order_not_editable", message)
        }
        DomainError::AlreadyCompleted => {
            json_error(StatusCode::CONFLICT, "already_completed", message)
        }
        DomainError::InsufficientStock(_) => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", message)
        }
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
