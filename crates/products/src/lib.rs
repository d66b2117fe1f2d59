//! Product catalog domain: the entities whose on-hand quantity the stock
//! ledger guards.

pub mod product;

pub use product::{NewProduct, Product, ProductId};
