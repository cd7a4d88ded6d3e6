pub mod analyzer;
pub mod cache;
pub mod parse;
pub mod prompt;
pub mod providers;

pub use analyzer::{AnalysisOutcome, AnalyzerConfig, NegotiationAnalyzer};
pub use providers::ProviderRegistry;
