pub mod app_config;
pub mod candidate;
pub mod error;
pub mod generation_config;
pub mod llm_config;
pub mod model_response;
pub mod operation;
pub mod run_manifest;
pub mod test_case;
