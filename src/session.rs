pub mod options;
pub mod orchestrator;
pub mod pending;

pub use options::RequestOptions;
pub use orchestrator::Session;
