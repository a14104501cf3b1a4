//! Analysis modules.
//!
//! Runs the external analysis scripts and aggregates the KPI metrics
//! from the shipment and customer datasets.

pub mod aggregator;
pub mod invoker;

pub use aggregator::{KpiRegistry, KpiSnapshot, KpiWarning};
pub use invoker::{InvokeError, ScriptInvoker};
