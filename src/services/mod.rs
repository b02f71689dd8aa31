pub mod archiver;
pub mod dashboard;
pub mod orchestrator;
pub mod reconciler;
pub mod riot;
pub mod season;
