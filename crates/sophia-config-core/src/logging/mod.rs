//! Logging abstractions
//!
//! Components take an `Arc<dyn Logger>`; hosts decide where lines go.

mod traits;
mod memory;
mod tracing_logger;

pub use traits::{LogLevel, Logger, SharedLogger};
pub use memory::MemoryLogger;
pub use tracing_logger::TracingLogger;
