//! Supplier domain. Supplier identity is opaque to the restocking engine;
//! it is only validated for existence at order creation.

pub mod supplier;

pub use supplier::{NewSupplier, Supplier, SupplierId};
