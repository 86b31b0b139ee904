// src/inventory/resolver.rs

use std::sync::Arc;

use crate::config::ConfigSnapshot;
use crate::model::placements::{AdFormat, PlacementKey, UnitId, WaterfallEntry};

/// **广告位解析器**
///
/// 逻辑广告位 -> 具体广告单元 ID。对给定快照是纯函数，快照只在 reload 时整体替换。
///
/// 解析顺序：
/// 1. 请求高 floor 且配置了高 floor 单元 -> 高 floor 单元
/// 2. 远端下发的默认单元
/// 3. 沙盒模式下的上游测试单元
/// 4. 空字符串（调用方视为“不要请求”）
#[derive(Debug, Clone)]
pub struct PlacementResolver {
    format: AdFormat,
    snapshot: Arc<ConfigSnapshot>,
}

impl PlacementResolver {
    pub fn new(format: AdFormat, snapshot: Arc<ConfigSnapshot>) -> Self {
        Self { format, snapshot }
    }

    pub fn format(&self) -> AdFormat {
        self.format
    }

    pub fn snapshot(&self) -> &Arc<ConfigSnapshot> {
        &self.snapshot
    }

    pub fn resolve(&self, key: &PlacementKey, high_floor: bool) -> UnitId {
        if high_floor {
            if let Some(id) = self.high_floor(key) {
                return id;
            }
        }
        if let Some(id) = self.snapshot.unit_ids.get(key).filter(|id| !id.is_empty()) {
            return id.clone();
        }
        self.sandbox_fallback()
    }

    /// 配置的高 floor 单元（空字符串视为未配置）
    pub fn high_floor(&self, key: &PlacementKey) -> Option<UnitId> {
        self.snapshot
            .high_floor_unit_ids
            .get(key)
            .filter(|id| !id.is_empty())
            .cloned()
    }

    /// 高 floor 和低 floor 是否真的是两个不同的单元（决定是否需要降级）
    pub fn has_distinct_high_floor(&self, key: &PlacementKey) -> bool {
        match self.high_floor(key) {
            Some(high) => high != self.resolve(key, false),
            None => false,
        }
    }

    /// 展示时的查找顺序：高 floor 优先，然后低 floor，去重去空
    pub fn lookup_order(&self, key: &PlacementKey) -> Vec<UnitId> {
        let mut ids = Vec::with_capacity(2);
        if let Some(high) = self.high_floor(key) {
            ids.push(high);
        }
        let low = self.resolve(key, false);
        if !low.is_empty() && !ids.contains(&low) {
            ids.push(low);
        }
        ids
    }

    /// 瀑布流内置低 floor 基础单元
    pub fn base_low(&self) -> UnitId {
        self.snapshot
            .floor_low
            .get(&self.format)
            .filter(|id| !id.is_empty())
            .cloned()
            .unwrap_or_else(|| self.sandbox_fallback())
    }

    /// 瀑布流内置高 floor 基础单元
    pub fn base_high(&self) -> UnitId {
        self.snapshot
            .floor_high
            .get(&self.format)
            .filter(|id| !id.is_empty())
            .cloned()
            .unwrap_or_else(|| self.sandbox_fallback())
    }

    pub fn waterfall_entries(&self) -> &[WaterfallEntry] {
        self.snapshot.waterfall_entries(self.format)
    }

    fn sandbox_fallback(&self) -> UnitId {
        if self.snapshot.sandbox {
            UnitId::from(self.format.test_unit_id())
        } else {
            UnitId::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConfigSnapshot {
        let mut snapshot = ConfigSnapshot::default();
        snapshot
            .unit_ids
            .insert(PlacementKey::from("inter_common"), UnitId::from("inter-low"));
        snapshot
            .high_floor_unit_ids
            .insert(PlacementKey::from("inter_common"), UnitId::from("inter-high"));
        snapshot
            .unit_ids
            .insert(PlacementKey::from("inter_result"), UnitId::from("result-low"));
        snapshot
            .high_floor_unit_ids
            .insert(PlacementKey::from("inter_blank"), UnitId::from(""));
        snapshot
    }

    #[test]
    fn high_floor_wins_when_requested() {
        let resolver = PlacementResolver::new(AdFormat::Interstitial, Arc::new(snapshot()));
        let key = PlacementKey::from("inter_common");
        assert_eq!(resolver.resolve(&key, true), UnitId::from("inter-high"));
        assert_eq!(resolver.resolve(&key, false), UnitId::from("inter-low"));
        assert!(resolver.has_distinct_high_floor(&key));
        assert_eq!(
            resolver.lookup_order(&key),
            vec![UnitId::from("inter-high"), UnitId::from("inter-low")]
        );
    }

    #[test]
    fn missing_high_floor_falls_back_to_default() {
        let resolver = PlacementResolver::new(AdFormat::Interstitial, Arc::new(snapshot()));
        let key = PlacementKey::from("inter_result");
        assert_eq!(resolver.resolve(&key, true), UnitId::from("result-low"));
        assert!(!resolver.has_distinct_high_floor(&key));
    }

    #[test]
    fn blank_high_floor_is_ignored() {
        let resolver = PlacementResolver::new(AdFormat::Interstitial, Arc::new(snapshot()));
        assert_eq!(resolver.high_floor(&PlacementKey::from("inter_blank")), None);
    }

    #[test]
    fn unknown_key_resolves_empty_outside_sandbox() {
        let resolver = PlacementResolver::new(AdFormat::Native, Arc::new(snapshot()));
        let key = PlacementKey::from("native_unknown");
        assert!(resolver.resolve(&key, true).is_empty());
        assert!(resolver.lookup_order(&key).is_empty());
        assert!(resolver.base_low().is_empty());
    }

    #[test]
    fn sandbox_falls_back_to_test_ids() {
        let mut snapshot = snapshot();
        snapshot.sandbox = true;
        snapshot.floor_high.insert(AdFormat::Native, UnitId::from("n-high"));
        let resolver = PlacementResolver::new(AdFormat::Native, Arc::new(snapshot));
        let key = PlacementKey::from("native_unknown");
        assert_eq!(
            resolver.resolve(&key, false),
            UnitId::from(AdFormat::Native.test_unit_id())
        );
        assert_eq!(resolver.base_low(), UnitId::from(AdFormat::Native.test_unit_id()));
        assert_eq!(resolver.base_high(), UnitId::from("n-high"));
    }
}
