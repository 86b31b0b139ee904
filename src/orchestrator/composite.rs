// src/orchestrator/composite.rs

use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

use crate::config::ConfigSnapshot;
use crate::model::creative::CreativeInfo;
use crate::model::placements::{AdFormat, PlacementKey};
use crate::orchestrator::{
    AdManager, AppOpenAds, BannerAds, Collaborators, InterstitialAds, Loadable, NativeAds,
    RewardedAds, Showable, WaterfallCapable,
};

/// **组合门面**
///
/// 把生命周期操作扇出给所有格式编排器。布尔查询取“任意一个”，
/// 查找取“第一个非空”。各编排器互相独立，不保证顺序。
#[derive(Clone, Default)]
pub struct CompositeAdManager {
    managers: Vec<Arc<dyn AdManager>>,
}

impl CompositeAdManager {
    pub fn new(managers: Vec<Arc<dyn AdManager>>) -> Self {
        Self { managers }
    }

    pub fn register(&mut self, manager: Arc<dyn AdManager>) {
        self.managers.push(manager);
    }

    pub fn formats(&self) -> Vec<AdFormat> {
        self.managers.iter().map(|m| m.format()).collect()
    }

    pub fn init(&self) {
        info!(managers = self.managers.len(), "initializing ad managers");
        for manager in &self.managers {
            manager.init();
        }
    }

    pub fn destroy_all(&self) {
        for manager in &self.managers {
            manager.destroy_all();
        }
    }

    pub fn pause(&self) {
        for manager in &self.managers {
            manager.pause();
        }
    }

    pub fn resume(&self) {
        for manager in &self.managers {
            manager.resume();
        }
    }

    pub fn reload(&self, snapshot: Arc<ConfigSnapshot>) {
        for manager in &self.managers {
            manager.reload(snapshot.clone());
        }
    }

    pub async fn is_ad_loaded(&self, key: &PlacementKey) -> bool {
        join_all(self.managers.iter().map(|m| m.is_ad_loaded(key)))
            .await
            .into_iter()
            .any(|loaded| loaded)
    }

    pub async fn loaded_ad(&self, key: &PlacementKey) -> Option<CreativeInfo> {
        join_all(self.managers.iter().map(|m| m.loaded_ad(key)))
            .await
            .into_iter()
            .flatten()
            .next()
    }
}

/// 五个格式的编排器，进程启动时创建一次
#[derive(Clone)]
pub struct AdOrchestrators {
    pub native: NativeAds,
    pub interstitial: InterstitialAds,
    pub app_open: AppOpenAds,
    pub rewarded: RewardedAds,
    pub banner: BannerAds,
}

impl AdOrchestrators {
    pub fn spawn(snapshot: Arc<ConfigSnapshot>, collaborators: Collaborators) -> Self {
        Self {
            native: NativeAds::spawn(snapshot.clone(), collaborators.clone()),
            interstitial: InterstitialAds::spawn(snapshot.clone(), collaborators.clone()),
            app_open: AppOpenAds::spawn(snapshot.clone(), collaborators.clone()),
            rewarded: RewardedAds::spawn(snapshot.clone(), collaborators.clone()),
            banner: BannerAds::spawn(snapshot, collaborators),
        }
    }

    pub fn composite(&self) -> CompositeAdManager {
        CompositeAdManager::new(vec![
            Arc::new(self.native.clone()),
            Arc::new(self.interstitial.clone()),
            Arc::new(self.app_open.clone()),
            Arc::new(self.rewarded.clone()),
            Arc::new(self.banner.clone()),
        ])
    }

    pub fn manager(&self, format: AdFormat) -> &dyn AdManager {
        match format {
            AdFormat::Native => &self.native,
            AdFormat::Interstitial => &self.interstitial,
            AdFormat::AppOpen => &self.app_open,
            AdFormat::Rewarded => &self.rewarded,
            AdFormat::Banner => &self.banner,
        }
    }

    pub fn loadable(&self, format: AdFormat) -> &dyn Loadable {
        match format {
            AdFormat::Native => &self.native,
            AdFormat::Interstitial => &self.interstitial,
            AdFormat::AppOpen => &self.app_open,
            AdFormat::Rewarded => &self.rewarded,
            AdFormat::Banner => &self.banner,
        }
    }

    /// 只有全屏格式支持展示协议
    pub fn showable(&self, format: AdFormat) -> Option<&dyn Showable> {
        match format {
            AdFormat::Interstitial => Some(&self.interstitial),
            AdFormat::AppOpen => Some(&self.app_open),
            AdFormat::Rewarded => Some(&self.rewarded),
            AdFormat::Native | AdFormat::Banner => None,
        }
    }

    pub fn waterfall(&self, format: AdFormat) -> Option<&dyn WaterfallCapable> {
        match format {
            AdFormat::Native => Some(&self.native),
            AdFormat::Interstitial => Some(&self.interstitial),
            _ => None,
        }
    }

    pub fn shutdown(&self) {
        self.native.shutdown();
        self.interstitial.shutdown();
        self.app_open.shutdown();
        self.rewarded.shutdown();
        self.banner.shutdown();
    }
}
