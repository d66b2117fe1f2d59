//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, state conflicts). Infrastructure concerns belong elsewhere.
///
/// Variants fall into the engine's taxonomy:
/// - validation errors (`Validation`, `InvalidLine`, `DuplicateLine`,
///   `LineNotFound`, `EmptyOrder`) — caller-correctable, nothing mutated;
/// - state errors (`OrderNotEditable`, `AlreadyCompleted`) — the order exists
///   but its status forbids the operation;
/// - consistency errors (`InsufficientStock`, `Conflict`) — possibly
///   transient, safe to retry the whole operation;
/// - `NotFound` / `InvalidId` — caller-correctable lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An order line failed validation (non-positive quantity, negative cost).
    #[error("invalid line: {0}")]
    InvalidLine(String),

    /// The product already has a line on this order; callers must update the
    /// existing line instead of adding a second one.
    #[error("duplicate line for product {0}")]
    DuplicateLine(String),

    /// No line exists for the given product on this order.
    #[error("no line for product {0}")]
    LineNotFound(String),

    /// Orders cannot be created or completed without at least one line.
    #[error("order has no lines")]
    EmptyOrder,

    /// The order is in a terminal state and can no longer be modified.
    #[error("order is {0} and can no longer be modified")]
    OrderNotEditable(String),

    /// The order was already completed; stock deltas were applied exactly once.
    #[error("order is already completed")]
    AlreadyCompleted,

    /// Applying the delta would make the product quantity negative.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level). Carries a short
    /// description of what was missing (e.g. `product <id>`).
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. concurrent writer won the race).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_line(msg: impl Into<String>) -> Self {
        Self::InvalidLine(msg.into())
    }

    pub fn duplicate_line(product: impl Into<String>) -> Self {
        Self::DuplicateLine(product.into())
    }

    pub fn line_not_found(product: impl Into<String>) -> Self {
        Self::LineNotFound(product.into())
    }

    pub fn not_editable(status: impl Into<String>) -> Self {
        Self::OrderNotEditable(status.into())
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        Self::InsufficientStock(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
