// src/orchestrator/native.rs

use std::sync::Arc;

use crate::config::ConfigSnapshot;
use crate::model::placements::AdFormat;
use crate::orchestrator::actor::{
    impl_format_handle, impl_waterfall, FormatHandle, FormatRules, RetryModel,
};
use crate::orchestrator::Collaborators;

/// **原生广告编排器**
///
/// 渲染层通过 `loaded_ad` 窥视、`consume` 取走素材，没有全屏展示协议。
/// 非瀑布流时预加载请求排成 FIFO 队列逐个执行，每条链低 floor 失败
/// 计入 `max_retry_count`（默认 2）；开启瀑布流后普通预加载被忽略。
#[derive(Clone)]
pub struct NativeAds {
    handle: FormatHandle,
}

impl NativeAds {
    pub fn spawn(snapshot: Arc<ConfigSnapshot>, collaborators: Collaborators) -> Self {
        let rules = FormatRules {
            format: AdFormat::Native,
            retry: RetryModel::Escalate,
            showable: false,
            finish_on_click: false,
            sequential_preload: true,
            supports_waterfall: true,
        };
        Self {
            handle: FormatHandle::spawn(rules, snapshot, collaborators),
        }
    }
}

impl_format_handle!(NativeAds);
impl_waterfall!(NativeAds);
