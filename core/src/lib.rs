//! The probing engine.
//!
//! [`Engine::run`] takes an inventory and a [`RunConfig`](multiping_common::RunConfig),
//! expands them into targets, drives every target through the [`dispatcher`]
//! and hands the finished results to the [`aggregator`], which seals the
//! [`RunReport`](multiping_common::RunReport).

pub mod aggregator;
pub mod dispatcher;
pub mod engine;
pub mod registry;
pub mod targets;

pub use aggregator::{Aggregator, Progress, ProgressCallback};
pub use dispatcher::{DispatchSummary, Dispatcher};
pub use engine::{Engine, run};
pub use registry::Registry;
pub use targets::expand;
