// src/config/snapshot.rs

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::error::ConfigError;
use crate::model::placements::{AdFormat, PlacementKey, UnitId, WaterfallEntry};

/// 广告单元的 TTL，固定 1 小时
pub const CREATIVE_TTL: Duration = Duration::from_secs(3600);

/// load_and_show 高 floor 失败后降级到低 floor 前的固定等待
pub const LOAD_AND_SHOW_ESCALATION_DELAY: Duration = Duration::from_millis(1000);

/// 轮询展示的 tick 间隔
pub const POLL_TICK: Duration = Duration::from_secs(1);

/// **一次完整的配置快照**
///
/// 由 `ConfigProvider` 拉取，整体替换，不会在飞行中的请求里被隐式修改。
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ConfigSnapshot {
    /// 全局关闭广告
    pub ads_disabled: bool,
    /// 允许解析器兜底到上游的测试广告位
    pub sandbox: bool,
    pub waterfall: WaterfallConfig,
    pub reload_time: ReloadTime,
    /// 广告位 -> 远端下发的默认广告单元
    pub unit_ids: HashMap<PlacementKey, UnitId>,
    /// 广告位 -> 高 floor 广告单元（可选）
    pub high_floor_unit_ids: HashMap<PlacementKey, UnitId>,
    /// 瀑布流内置低 / 高 floor 基础单元，按格式
    pub floor_low: HashMap<AdFormat, UnitId>,
    pub floor_high: HashMap<AdFormat, UnitId>,
    pub native_waterfall: Vec<WaterfallEntry>,
    pub interstitial_waterfall: Vec<WaterfallEntry>,
    pub native: FormatConfig,
    pub interstitial: FormatConfig,
    pub app_open: FormatConfig,
    pub rewarded: FormatConfig,
    pub banner: FormatConfig,
    /// 广告位 -> 可折叠 banner 的位置（"top" / "bottom"）
    pub banner_collapsible: HashMap<PlacementKey, String>,
    /// 不做后台预加载 / 补货的广告位
    pub non_preloaded: Vec<PlacementKey>,
    pub click_guard: ClickGuardConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct WaterfallConfig {
    pub enabled: bool,
    /// true: 一个随机池轮转所有候选；false: 每个候选一个 holder
    pub random_mode: bool,
    /// 启动时相邻两个 slot 开始加载之间的间隔（毫秒）
    pub ramp_up_ms: u64,
    pub max_retry: Option<u32>,
}

impl WaterfallConfig {
    pub fn max_retry(&self) -> u32 {
        self.max_retry.unwrap_or(3)
    }

    pub fn ramp_up(&self) -> Duration {
        Duration::from_millis(self.ramp_up_ms)
    }
}

/// 失败重试的退避参数（毫秒）
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ReloadTime {
    pub base_time: u64,
    pub add_time: u64,
    pub max: u64,
}

impl Default for ReloadTime {
    fn default() -> Self {
        Self {
            base_time: 1000,
            add_time: 1000,
            max: 10_000,
        }
    }
}

/// 单个格式的调参项，全部可选，缺省值见 `FormatSettings::resolve`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct FormatConfig {
    pub cooldown_secs: Option<u64>,
    pub timeout_secs: Option<u32>,
    pub fail_reload_ms: Option<u64>,
    pub max_retry_count: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ClickGuardConfig {
    pub time_per_session: u64,
    pub max_ad_click_per_session: u32,
    pub time_disable_ads_when_reached_max_ad_click: u64,
}

impl Default for ClickGuardConfig {
    fn default() -> Self {
        Self {
            time_per_session: 300,
            max_ad_click_per_session: 6,
            time_disable_ads_when_reached_max_ad_click: 1800,
        }
    }
}

/// 解析好的格式参数，编排器直接使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSettings {
    pub cooldown: Duration,
    /// 轮询展示最多等待的 tick 数（每 tick 1 秒）
    pub poll_timeout_ticks: u32,
    /// 后台预加载高 floor 失败后降级前的等待
    pub escalation_delay: Duration,
    /// 失败预算：降级模型下是低 floor 失败多少次后放弃整个请求，
    /// 退避模型（banner）下是同一单元的最大重试次数
    pub max_low_floor_failures: u32,
}

impl FormatSettings {
    pub fn resolve(format: AdFormat, config: &FormatConfig) -> Self {
        let (cooldown, reload_ms, max_failures) = match format {
            AdFormat::Native => (0, 100, 2),
            AdFormat::Interstitial => (60, 1000, 1),
            AdFormat::AppOpen => (0, 1000, 1),
            AdFormat::Rewarded => (90, 3000, 1),
            AdFormat::Banner => (0, 300, 3),
        };
        Self {
            cooldown: Duration::from_secs(config.cooldown_secs.unwrap_or(cooldown)),
            poll_timeout_ticks: config.timeout_secs.unwrap_or(5),
            escalation_delay: Duration::from_millis(config.fail_reload_ms.unwrap_or(reload_ms)),
            max_low_floor_failures: config.max_retry_count.unwrap_or(max_failures).max(1),
        }
    }
}

impl ConfigSnapshot {
    pub fn format_config(&self, format: AdFormat) -> &FormatConfig {
        match format {
            AdFormat::Native => &self.native,
            AdFormat::Interstitial => &self.interstitial,
            AdFormat::AppOpen => &self.app_open,
            AdFormat::Rewarded => &self.rewarded,
            AdFormat::Banner => &self.banner,
        }
    }

    pub fn settings(&self, format: AdFormat) -> FormatSettings {
        FormatSettings::resolve(format, self.format_config(format))
    }

    /// 该格式的瀑布流候选列表；只有原生和插屏支持瀑布流
    pub fn waterfall_entries(&self, format: AdFormat) -> &[WaterfallEntry] {
        match format {
            AdFormat::Native => &self.native_waterfall,
            AdFormat::Interstitial => &self.interstitial_waterfall,
            _ => &[],
        }
    }

    pub fn is_preload_disabled(&self, key: &PlacementKey) -> bool {
        self.non_preloaded.contains(key)
    }

    /// 基本的一致性检查
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reload_time.max < self.reload_time.base_time {
            return Err(ConfigError::Invalid(format!(
                "reload_time.max ({}) is below reload_time.base_time ({})",
                self.reload_time.max, self.reload_time.base_time
            )));
        }
        for format in [AdFormat::Native, AdFormat::Interstitial] {
            let mut seen = HashSet::new();
            for entry in self.waterfall_entries(format) {
                if !seen.insert(entry.name.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate {} waterfall entry '{}'",
                        format, entry.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let snapshot: ConfigSnapshot = serde_json::from_str("{}").unwrap();
        assert!(!snapshot.ads_disabled);
        assert_eq!(snapshot.reload_time, ReloadTime::default());
        assert_eq!(snapshot.waterfall.max_retry(), 3);

        let inter = snapshot.settings(AdFormat::Interstitial);
        assert_eq!(inter.cooldown, Duration::from_secs(60));
        assert_eq!(inter.poll_timeout_ticks, 5);

        let native = snapshot.settings(AdFormat::Native);
        assert_eq!(native.max_low_floor_failures, 2);
        assert_eq!(native.escalation_delay, Duration::from_millis(100));
    }

    #[test]
    fn parses_tables_keyed_by_format() {
        let raw = r#"{
            "floor_low": { "native": "low-n", "interstitial": "low-i" },
            "high_floor_unit_ids": { "inter_common": "inter-high" },
            "interstitial": { "cooldown_secs": 30, "timeout_secs": 8 },
            "interstitial_waterfall": [ { "name": "I-A", "unit_id": "a" } ]
        }"#;
        let snapshot: ConfigSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.floor_low[&AdFormat::Native], UnitId::from("low-n"));
        assert_eq!(
            snapshot.high_floor_unit_ids[&PlacementKey::from("inter_common")],
            UnitId::from("inter-high")
        );
        let inter = snapshot.settings(AdFormat::Interstitial);
        assert_eq!(inter.cooldown, Duration::from_secs(30));
        assert_eq!(inter.poll_timeout_ticks, 8);
        assert_eq!(snapshot.waterfall_entries(AdFormat::Interstitial).len(), 1);
        assert!(snapshot.waterfall_entries(AdFormat::Rewarded).is_empty());
    }

    #[test]
    fn validate_rejects_duplicate_waterfall_names() {
        let raw = r#"{ "native_waterfall": [
            { "name": "N-A", "unit_id": "a" },
            { "name": "N-A", "unit_id": "b" }
        ] }"#;
        let snapshot: ConfigSnapshot = serde_json::from_str(raw).unwrap();
        assert!(matches!(snapshot.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_inverted_reload_time() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot.reload_time.base_time = 20_000;
        assert!(snapshot.validate().is_err());
    }
}
