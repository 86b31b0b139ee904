pub mod adapters;
pub mod config_manager;
pub mod snapshot;

pub use adapters::{ConfigProvider, FileConfigProvider, StaticConfigProvider};
pub use config_manager::ConfigManager;
pub use snapshot::{
    ClickGuardConfig, ConfigSnapshot, FormatConfig, FormatSettings, ReloadTime, WaterfallConfig,
};
