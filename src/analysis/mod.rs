//! Site analysis: prompting, parsing, orchestration and aggregation.

pub mod aggregator;
pub mod orchestrator;
pub mod parser;
pub mod prompt;

pub use orchestrator::{plan_passes, AnalysisOrchestrator};
