//! Market price crawler: fetches a public price listing for a date range and
//! turns the published HTML grid into a CSV the staging loader can consume.
//!
//! The crate exposes a [`source::PriceSource`] trait so the pipeline can be
//! driven by any fetch implementation (the production HTTP one, or a fake in
//! tests), plus the in-memory [`table::PriceTable`] that both sides share.

pub mod errors;
pub mod http;
pub mod source;
pub mod table;
