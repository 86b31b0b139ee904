// src/orchestrator/app_open.rs

use std::sync::Arc;

use crate::config::ConfigSnapshot;
use crate::model::placements::AdFormat;
use crate::orchestrator::actor::{
    impl_format_handle, impl_showable, FormatHandle, FormatRules, RetryModel,
};
use crate::orchestrator::Collaborators;

/// 开屏广告编排器：冷启动时 `load_and_show` 带超时，回到前台时 `show_if_available`
#[derive(Clone)]
pub struct AppOpenAds {
    handle: FormatHandle,
}

impl AppOpenAds {
    pub fn spawn(snapshot: Arc<ConfigSnapshot>, collaborators: Collaborators) -> Self {
        let rules = FormatRules {
            format: AdFormat::AppOpen,
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

impl_format_handle!(AppOpenAds);
impl_showable!(AppOpenAds);
