pub mod config;
pub mod engine;
pub mod error;
pub mod processor;
pub mod store;
pub mod topic;

pub use engine::Engine;
pub use error::{BusError, EngineError};
pub use processor::Processor;
pub use store::TopicStore;
pub use topic::{DataBus, DataReader, DataWriter};
