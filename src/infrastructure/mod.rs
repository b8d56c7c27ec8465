pub mod config;
pub mod export;
pub mod llm_clients;
pub mod openapi;
pub mod response;
