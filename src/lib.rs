//! Invigil: Timed Assessment Delivery & Navigation
//!
//! A state-machine engine that walks a test-taker through an assessment of
//! sections and items, enforcing timing windows and attempt limits,
//! recording responses, and persisting its runtime state after every
//! transition so an attempt survives independent stateless requests.

pub mod concurrency;
pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod eval;
pub mod factory;
pub mod info;
pub mod logging;
pub mod navigator;
pub mod resolver;
pub mod snapshot;
pub mod types;
