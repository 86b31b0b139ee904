// src/model/placements.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// 广告格式
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
    Native,
    Banner,
    Interstitial,
    AppOpen,
    Rewarded,
}

impl AdFormat {
    pub const ALL: [AdFormat; 5] = [
        AdFormat::Native,
        AdFormat::Banner,
        AdFormat::Interstitial,
        AdFormat::AppOpen,
        AdFormat::Rewarded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdFormat::Native => "native",
            AdFormat::Banner => "banner",
            AdFormat::Interstitial => "interstitial",
            AdFormat::AppOpen => "app_open",
            AdFormat::Rewarded => "rewarded",
        }
    }

    /// 上游提供的沙盒测试广告位（没有任何配置时的兜底）
    pub fn test_unit_id(&self) -> &'static str {
        match self {
            AdFormat::Native => "ca-app-pub-3940256099942544/2247696110",
            AdFormat::Banner => "ca-app-pub-3940256099942544/9214589741",
            AdFormat::Interstitial => "ca-app-pub-3940256099942544/1033173712",
            AdFormat::AppOpen => "ca-app-pub-3940256099942544/9257395921",
            AdFormat::Rewarded => "ca-app-pub-3940256099942544/5224354917",
        }
    }

    /// 瀑布流内置 holder 的名字前缀，例如 "I-Base-Low"
    pub fn waterfall_prefix(&self) -> &'static str {
        match self {
            AdFormat::Native => "N",
            AdFormat::Banner => "B",
            AdFormat::Interstitial => "I",
            AdFormat::AppOpen => "O",
            AdFormat::Rewarded => "R",
        }
    }
}

impl fmt::Display for AdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 价格档位：高 floor 先尝试，低 floor 兜底
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Floor {
    High,
    Low,
}

impl Floor {
    pub fn from_high(high: bool) -> Self {
        if high {
            Floor::High
        } else {
            Floor::Low
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Floor::High)
    }
}

/// 逻辑广告位（例如 "native_onboard_screen"），由宿主应用提供
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PlacementKey(String);

impl PlacementKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlacementKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlacementKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 上游网络分配的具体广告单元 ID；空字符串表示“不要请求”
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UnitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 瀑布流中的一个候选广告单元（配置里的 `[{name, unit_id}]`）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WaterfallEntry {
    pub name: String,
    pub unit_id: UnitId,
}
