// src/orchestrator/interstitial.rs

use std::sync::Arc;

use crate::config::ConfigSnapshot;
use crate::model::placements::AdFormat;
use crate::orchestrator::actor::{
    impl_format_handle, impl_showable, impl_waterfall, FormatHandle, FormatRules, RetryModel,
};
use crate::orchestrator::Collaborators;

/// **插屏广告编排器**
///
/// - 非瀑布流：每个广告位高 floor 先试，失败后降级一次到低 floor
/// - 瀑布流：基础低/高 floor holder 加上配置里的候选（逐个 holder 或一个随机池）
/// - 点击即结束展示回调，冷却默认 60 秒
#[derive(Clone)]
pub struct InterstitialAds {
    handle: FormatHandle,
}

impl InterstitialAds {
    pub fn spawn(snapshot: Arc<ConfigSnapshot>, collaborators: Collaborators) -> Self {
        let rules = FormatRules {
            format: AdFormat::Interstitial,
            retry: RetryModel::Escalate,
            showable: true,
            finish_on_click: true,
            sequential_preload: false,
            supports_waterfall: true,
        };
        Self {
            handle: FormatHandle::spawn(rules, snapshot, collaborators),
        }
    }
}

impl_format_handle!(InterstitialAds);
impl_showable!(InterstitialAds);
impl_waterfall!(InterstitialAds);
