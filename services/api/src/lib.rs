//! services/api/src/lib.rs
//!
//! Library crate for the review-portal API service: configuration,
//! adapters for the core's ports, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
