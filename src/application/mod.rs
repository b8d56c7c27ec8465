pub mod use_cases;

pub use use_cases::coordinator::{GenerationCoordinator, GenerationRun};
pub use use_cases::run_summary::RunSummary;
