//! Checkout orchestration core for an order-ahead food-delivery storefront.
//!
//! Turns a mutable cart plus a selected delivery address into a priced,
//! validated, and paid order, coordinating the pricing service, the
//! serviceability check, order creation, and the external payment gateway.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod clients;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use errors::CheckoutError;
pub use events::{Event, EventSender, Severity};
pub use services::checkout::{
    BranchContext, CheckoutPhase, CheckoutService, CheckoutSession, CheckoutStage,
    ConflictResolution,
};
