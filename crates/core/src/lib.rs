//! Diag Wheels Core - Shared types and pure catalog logic.
//!
//! This crate provides the pieces of the Diag Wheels frontend that do not
//! talk to the network. It is used by:
//! - `storefront` - Server-rendered site and admin console
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. Everything here is re-run synchronously per request.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`pricing`] - Quantity-tiered pricing, cart totals and upsell hints
//! - [`category`] - Category tree and cascading category filter
//! - [`validation`] - Form validation shared by storefront handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod category;
pub mod pricing;
pub mod types;
pub mod validation;

pub use types::*;
