// src/orchestrator/rewarded.rs

use std::sync::Arc;

use crate::config::ConfigSnapshot;
use crate::model::placements::AdFormat;
use crate::orchestrator::actor::{
    impl_format_handle, impl_showable, FormatHandle, FormatRules, RetryModel,
};
use crate::orchestrator::Collaborators;

/// 激励视频编排器。展示期间收到的奖励在 `ShowOutcome::Dismissed { reward }` 里返回。
#[derive(Clone)]
pub struct RewardedAds {
    handle: FormatHandle,
}

impl RewardedAds {
    pub fn spawn(snapshot: Arc<ConfigSnapshot>, collaborators: Collaborators) -> Self {
        let rules = FormatRules {
            format: AdFormat::Rewarded,
            retry: RetryModel::Escalate,
            showable: true,
            finish_on_click: false,
            sequential_preload: false,
            supports_waterfall: false,
        };
        Self {
            handle: FormatHandle::spawn(rules, snapshot, collaborators),
        }
    }
}

impl_format_handle!(RewardedAds);
impl_showable!(RewardedAds);
