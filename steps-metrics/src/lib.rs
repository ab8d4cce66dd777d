//! Derived metrics for the steps core.
//!
//! A fixed three-node graph turns the ledger's "steps today" view into the
//! values the UI charts:
//!
//! ```text
//! ledger view ──► steps_today ──► calories_today ──┐
//!                                                  ├──► calories_remaining
//!                      calorie goal (from sync) ───┘
//! ```
//!
//! Every node is an [`Observable`](steps_types::Observable), so consumers may
//! attach in any order and immediately see the last computed value.

mod config;
mod engine;

pub use config::{MetricsConfig, STEPS_TO_CALORIE_FACTOR};
pub use engine::MetricsEngine;
