// src/model/creative.rs

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::model::placements::{AdFormat, UnitId};

/// 原生广告素材
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NativeAssets {
    pub headline: String,
    pub body: Option<String>,
    pub call_to_action: Option<String>,
    pub icon_url: Option<String>,
    pub image_url: Option<String>,
}

/// 激励视频发放的奖励
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Reward {
    pub kind: String,
    pub amount: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerSize {
    pub width: u32,
    pub height: u32,
}

/// 各格式的素材内容
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CreativePayload {
    Native(NativeAssets),
    Interstitial,
    AppOpen,
    Rewarded(Reward),
    Banner(BannerSize),
}

impl CreativePayload {
    pub fn format(&self) -> AdFormat {
        match self {
            CreativePayload::Native(_) => AdFormat::Native,
            CreativePayload::Interstitial => AdFormat::Interstitial,
            CreativePayload::AppOpen => AdFormat::AppOpen,
            CreativePayload::Rewarded(_) => AdFormat::Rewarded,
            CreativePayload::Banner(_) => AdFormat::Banner,
        }
    }
}

/// **加载成功的广告实例**
///
/// 不实现 `Clone`：同一时刻只被一个 slot 持有，消费时所有权转移给调用方，
/// 因此同一个素材不可能被展示两次。
#[derive(Debug)]
pub struct Creative {
    id: Uuid,
    unit_id: UnitId,
    payload: CreativePayload,
    loaded_at: Instant,
}

impl Creative {
    pub fn new(unit_id: UnitId, payload: CreativePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            payload,
            loaded_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    pub fn format(&self) -> AdFormat {
        self.payload.format()
    }

    pub fn payload(&self) -> &CreativePayload {
        &self.payload
    }

    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    /// 生成一个只读快照，供渲染层 / 状态接口窥视而不转移所有权
    pub fn info(&self) -> CreativeInfo {
        CreativeInfo {
            id: self.id,
            unit_id: self.unit_id.clone(),
            format: self.format(),
            payload: self.payload.clone(),
            age_ms: self.loaded_at.elapsed().as_millis() as u64,
        }
    }
}

/// Creative 的可序列化快照
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreativeInfo {
    pub id: Uuid,
    pub unit_id: UnitId,
    pub format: AdFormat,
    pub payload: CreativePayload,
    pub age_ms: u64,
}
