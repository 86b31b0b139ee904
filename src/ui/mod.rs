pub mod indicator;

pub use indicator::{LoadingIndicator, NoopIndicator};
