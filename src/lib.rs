//! 移动端广告库存编排器
//!
//! 每个广告格式一个编排器 actor，负责预加载、floor 降级、退避重试、
//! TTL 自动刷新、瀑布流以及展示 / 冷却协议。`AdOrchestrators` 一次创建五个，
//! `CompositeAdManager` 对它们统一扇出生命周期操作。

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod inventory;
pub mod logging;
pub mod model;
pub mod network;
pub mod orchestrator;
pub mod ui;

pub use config::{ConfigManager, ConfigSnapshot};
pub use error::{ConfigError, LoadError};
pub use model::{AdFormat, Creative, CreativeInfo, PlacementKey, UnitId};
pub use network::{AdNetwork, PresentEvent};
pub use orchestrator::{
    AdManager, AdOrchestrators, AdState, Collaborators, CompositeAdManager, LoadAndShowOptions,
    Loadable, ShowOutcome, ShowTicket, Showable, SkipReason, WaterfallCapable,
};
