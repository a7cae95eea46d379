pub mod registry;
pub mod stack;

pub use registry::{RequestCategory, RequestStackRegistry};
pub use stack::OrderingStack;
