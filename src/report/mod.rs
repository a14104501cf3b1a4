//! Response document assembly.

pub mod composite;

pub use composite::{merge, AnalysisResults};
