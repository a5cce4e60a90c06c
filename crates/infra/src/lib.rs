//! In-process wiring: storage, job registry, the local launcher and engine
//! configuration.

pub mod config;
pub mod launcher;
pub mod registry;
pub mod store;

pub use config::EngineConfig;
pub use launcher::LocalLauncher;
pub use registry::{JobFactory, JobRegistry};
pub use store::{ExecutionStore, InMemoryExecutionStore};
