pub mod actor;
pub mod app_open;
pub mod banner;
pub mod composite;
pub mod interstitial;
pub mod native;
pub mod rewarded;
pub(crate) mod runtime;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::config::ConfigSnapshot;
use crate::guard::{ClickGuard, NoopClickGuard};
use crate::model::creative::{Creative, CreativeInfo, Reward};
use crate::model::placements::{AdFormat, PlacementKey};
use crate::network::AdNetwork;
use crate::ui::{LoadingIndicator, NoopIndicator};

pub use actor::FormatHandle;
pub use app_open::AppOpenAds;
pub use banner::BannerAds;
pub use composite::{AdOrchestrators, CompositeAdManager};
pub use interstitial::InterstitialAds;
pub use native::NativeAds;
pub use rewarded::RewardedAds;

/// 展示请求被直接跳过的原因，不会发起任何网络请求
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AdsDisabled,
    ClickSuppressed,
    Cooldown,
    AlreadyShowing,
}

/// 一次展示请求的最终结果
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShowOutcome {
    /// 用户关闭了广告
    Dismissed {
        clicked: bool,
        reward: Option<Reward>,
    },
    /// 点击即结束（插屏）
    Clicked,
    Skipped {
        reason: SkipReason,
    },
    /// 没有可用素材，已经在后台补货
    Unavailable,
    LoadFailed,
    ShowFailed {
        reason: String,
    },
    /// load_and_show 超时或轮询等待超时；迟到的素材会留给下一次展示
    TimedOut,
    /// 编排器已停止或请求被 destroyAll 取消
    Aborted,
}

impl ShowOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        ShowOutcome::Skipped { reason }
    }

    /// 广告是否真的展示过
    pub fn was_shown(&self) -> bool {
        matches!(self, ShowOutcome::Dismissed { .. } | ShowOutcome::Clicked)
    }
}

/// 等待展示结果。编排器被 drop 时得到 `Aborted`。
#[derive(Debug)]
pub struct ShowTicket {
    rx: oneshot::Receiver<ShowOutcome>,
}

impl ShowTicket {
    pub(crate) fn new(rx: oneshot::Receiver<ShowOutcome>) -> Self {
        Self { rx }
    }
}

impl Future for ShowTicket {
    type Output = ShowOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(ShowOutcome::Aborted))
    }
}

/// 轮询展示路径使用的广告位状态
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdState {
    NotLoaded,
    Waiting,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadAndShowOptions {
    /// 设置后到点回复 `TimedOut`，迟到的素材进入 next-ad 缓存
    pub timeout: Option<Duration>,
    pub prefer_high_floor: bool,
}

impl Default for LoadAndShowOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            prefer_high_floor: true,
        }
    }
}

impl LoadAndShowOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }
}

/// 瀑布流 slot 的只读视图（状态接口用）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WaterfallSlotInfo {
    pub name: String,
    pub state: String,
    pub retry_count: u32,
    pub creative: Option<CreativeInfo>,
    /// 随机池最近一次命中的候选名
    pub chosen: Option<String>,
}

/// 编排器依赖的外部协作者
#[derive(Clone)]
pub struct Collaborators {
    pub network: Arc<dyn AdNetwork>,
    pub guard: Arc<dyn ClickGuard>,
    pub indicator: Arc<dyn LoadingIndicator>,
}

impl Collaborators {
    pub fn new(network: Arc<dyn AdNetwork>) -> Self {
        Self {
            network,
            guard: Arc::new(NoopClickGuard),
            indicator: Arc::new(NoopIndicator),
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn ClickGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.indicator = indicator;
        self
    }
}

/// 生命周期能力：组合门面对所有格式统一扇出
pub trait AdManager: Send + Sync {
    fn format(&self) -> AdFormat;

    fn init(&self);

    fn destroy_all(&self);

    fn pause(&self);

    fn resume(&self);

    fn reload(&self, snapshot: Arc<ConfigSnapshot>);

    fn is_ad_loaded(&self, key: &PlacementKey) -> BoxFuture<'static, bool>;

    fn loaded_ad(&self, key: &PlacementKey) -> BoxFuture<'static, Option<CreativeInfo>>;
}

/// 预加载 / 消费能力
pub trait Loadable: Send + Sync {
    fn preload(&self, key: &PlacementKey);

    /// 取走一个素材（所有权转移给调用方，随后自动补货）
    fn consume(&self, key: &PlacementKey) -> BoxFuture<'static, Option<Creative>>;

    fn ad_state(&self, key: &PlacementKey) -> BoxFuture<'static, AdState>;
}

/// 全屏展示能力
pub trait Showable: Send + Sync {
    /// 立即加载并展示，受开关、点击限制和冷却保护
    fn load_and_show(&self, key: &PlacementKey, options: LoadAndShowOptions) -> ShowTicket;

    /// 有素材就展示；没有但正在加载时显示遮罩轮询等待
    fn show(&self, key: &PlacementKey) -> ShowTicket;

    /// 有素材就展示，否则立即返回 `Unavailable` 并在后台预加载
    fn show_if_available(&self, key: &PlacementKey) -> ShowTicket;
}

/// 瀑布流能力
pub trait WaterfallCapable: Send + Sync {
    fn pause_waterfall(&self);

    fn resume_waterfall(&self);

    fn waterfall_slots(&self) -> BoxFuture<'static, Vec<WaterfallSlotInfo>>;
}
