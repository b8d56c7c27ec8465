pub mod case_validator;
pub mod context_builder;
pub mod coordinator;
pub mod deduplicator;
pub mod pipeline;
pub mod response_recovery;
pub mod run_summary;
