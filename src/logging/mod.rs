pub mod runtime_logger;

pub use runtime_logger::{LogLevel, RuntimeLogSettings, RuntimeLogger};
