//! Logistics network records: warehouses and shippers.
//!
//! These are the affiliations a session can carry for warehouse staff and
//! shipper principals.

pub mod shipper;
pub mod warehouse;

pub use shipper::{NewShipper, Shipper};
pub use warehouse::{NewWarehouse, Warehouse};
