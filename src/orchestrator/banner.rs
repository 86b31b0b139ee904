// src/orchestrator/banner.rs

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

use crate::config::ConfigSnapshot;
use crate::model::creative::Creative;
use crate::model::placements::{AdFormat, PlacementKey};
use crate::orchestrator::actor::{impl_format_handle, Command, FormatHandle, FormatRules, RetryModel};
use crate::orchestrator::Collaborators;

/// banner 编排器：不做 floor 降级，失败按退避重试同一单元
#[derive(Clone)]
pub struct BannerAds {
    handle: FormatHandle,
}

impl BannerAds {
    pub fn spawn(snapshot: Arc<ConfigSnapshot>, collaborators: Collaborators) -> Self {
        let rules = FormatRules {
            format: AdFormat::Banner,
            retry: RetryModel::Backoff,
            showable: false,
            finish_on_click: false,
            sequential_preload: false,
            supports_waterfall: false,
        };
        Self {
            handle: FormatHandle::spawn(rules, snapshot, collaborators),
        }
    }

    /// 缓存 UI 层自己创建好的 banner
    pub fn save(&self, key: &PlacementKey, creative: Creative) {
        self.handle.send(Command::Save(key.clone(), creative));
    }

    /// 页面永久离开时销毁该广告位的 banner
    pub fn destroy_ad(&self, key: &PlacementKey) {
        self.handle.send(Command::DestroyAd(key.clone()));
    }

    /// 可折叠 banner 的位置（"top" / "bottom"），未配置返回 None
    pub fn collapsible_position(&self, key: &PlacementKey) -> BoxFuture<'static, Option<String>> {
        let key = key.clone();
        self.handle
            .ask(|reply| Command::Collapsible(key, reply))
            .map(Option::flatten)
            .boxed()
    }
}

impl_format_handle!(BannerAds);
