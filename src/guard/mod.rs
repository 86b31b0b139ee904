pub mod click_guard;

pub use click_guard::{ClickGuard, NoopClickGuard, SessionClickGuard};
