pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod report;
