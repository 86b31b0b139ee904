// src/inventory/slot.rs

use std::time::Duration;
use tokio::time::Instant;

use crate::config::snapshot::CREATIVE_TTL;
use crate::inventory::backoff::BackoffPolicy;
use crate::model::creative::Creative;
use crate::model::placements::{Floor, UnitId};

/// slot 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Loading,
    Loaded,
    FailedRetrying,
    FailedTerminal,
}

/// 每次加载尝试选用哪个单元
pub trait UnitSource {
    fn next_unit(&mut self) -> UnitId;

    /// 加载成功后回调，池子用它记录命中的下标
    fn on_success(&mut self) {}

    fn chosen_name(&self) -> Option<&str> {
        None
    }
}

/// 固定单元（普通 slot）
#[derive(Debug, Clone)]
pub struct FixedUnit {
    unit_id: UnitId,
    floor: Floor,
}

impl FixedUnit {
    pub fn new(unit_id: UnitId, floor: Floor) -> Self {
        Self { unit_id, floor }
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    pub fn floor(&self) -> Floor {
        self.floor
    }
}

impl UnitSource for FixedUnit {
    fn next_unit(&mut self) -> UnitId {
        self.unit_id.clone()
    }
}

/// 一次已发出的请求。`generation` 用来识别过期的回调。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub unit_id: UnitId,
    pub generation: u64,
}

/// 加载成功后需要安排的过期定时器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryTimer {
    pub generation: u64,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// 过期的回调（slot 已被销毁或重新加载），忽略
    Stale,
    /// 按退避延迟后重试
    Retry { delay: Duration, retry_count: u32 },
    /// 暂停中或重试次数用尽，等待外部再次触发
    Terminal,
}

/// **单个 (广告位/池, 单元, floor) 的加载-缓存-过期状态机**
///
/// 不做任何 IO：调用方（编排器 actor）负责发请求和安排定时器，
/// slot 只根据事件推进状态并告诉调用方下一步做什么。
///
/// 不变量：
/// - 持有 creative 时一定有过期时间，且 retry_count == 0
/// - 同一时刻最多一个请求在飞
/// - 暂停时失败不安排重试
#[derive(Debug)]
pub struct Slot<S> {
    name: String,
    source: S,
    state: SlotState,
    creative: Option<Creative>,
    retry_count: u32,
    paused: bool,
    expiry_deadline: Option<Instant>,
    generation: u64,
}

pub type UnitSlot = Slot<FixedUnit>;

impl Slot<FixedUnit> {
    pub fn fixed(name: impl Into<String>, unit_id: UnitId, floor: Floor) -> Self {
        Slot::with_source(name, FixedUnit::new(unit_id, floor))
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.source.unit_id
    }

    pub fn floor(&self) -> Floor {
        self.source.floor
    }
}

impl<S: UnitSource> Slot<S> {
    pub fn with_source(name: impl Into<String>, source: S) -> Self {
        Self {
            name: name.into(),
            source,
            state: SlotState::Idle,
            creative: None,
            retry_count: 0,
            paused: false,
            expiry_deadline: None,
            generation: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_loading(&self) -> bool {
        self.state == SlotState::Loading
    }

    /// 正在请求或者已经安排了重试
    pub fn is_pending(&self) -> bool {
        matches!(self.state, SlotState::Loading | SlotState::FailedRetrying)
    }

    pub fn has_creative(&self) -> bool {
        self.creative.is_some()
    }

    pub fn peek(&self) -> Option<&Creative> {
        self.creative.as_ref()
    }

    #[cfg(test)]
    pub fn expiry_deadline(&self) -> Option<Instant> {
        self.expiry_deadline
    }

    /// Idle/Failed -> Loading。已在加载或已有缓存时返回 None（去重）。
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        match self.state {
            SlotState::Loading | SlotState::Loaded => return None,
            SlotState::Idle | SlotState::FailedTerminal => self.retry_count = 0,
            SlotState::FailedRetrying => {}
        }
        if self.creative.is_some() {
            return None;
        }
        let unit_id = self.source.next_unit();
        if unit_id.is_empty() {
            self.state = SlotState::Idle;
            return None;
        }
        self.generation += 1;
        self.state = SlotState::Loading;
        Some(LoadTicket {
            unit_id,
            generation: self.generation,
        })
    }

    /// Loading -> Loaded。回调已过期时把 creative 原样退回，由调用方释放。
    pub fn on_loaded(
        &mut self,
        generation: u64,
        creative: Creative,
        now: Instant,
    ) -> Result<ExpiryTimer, Creative> {
        if self.state != SlotState::Loading || generation != self.generation {
            return Err(creative);
        }
        self.source.on_success();
        Ok(self.store(creative, now))
    }

    /// Loading -> FailedRetrying / FailedTerminal（带退避的重试路径）
    pub fn on_failed(
        &mut self,
        generation: u64,
        policy: &BackoffPolicy,
        max_retry: u32,
    ) -> FailureOutcome {
        if self.state != SlotState::Loading || generation != self.generation {
            return FailureOutcome::Stale;
        }
        if self.paused || self.retry_count >= max_retry {
            self.state = SlotState::FailedTerminal;
            return FailureOutcome::Terminal;
        }
        let delay = policy.next_delay(self.retry_count);
        self.retry_count += 1;
        self.state = SlotState::FailedRetrying;
        FailureOutcome::Retry {
            delay,
            retry_count: self.retry_count,
        }
    }

    /// Loading -> FailedTerminal，不安排重试（floor 降级路径使用）
    pub fn fail_terminal(&mut self, generation: u64) -> bool {
        if self.state != SlotState::Loading || generation != self.generation {
            return false;
        }
        self.state = SlotState::FailedTerminal;
        true
    }

    /// 退避定时器到点。暂停期间到点的重试直接作废，resume 时会重新加载。
    pub fn retry_due(&mut self) -> Option<LoadTicket> {
        if self.state != SlotState::FailedRetrying {
            return None;
        }
        if self.paused {
            self.state = SlotState::FailedTerminal;
            return None;
        }
        self.begin_load()
    }

    /// 排队中的重试作废，slot 停在 FailedTerminal，下次 begin_load 重新计数
    pub fn abandon_retry(&mut self) {
        if self.state == SlotState::FailedRetrying {
            self.state = SlotState::FailedTerminal;
        }
    }

    /// TTL 到点：丢弃 creative 回到 Idle，调用方负责释放并重新加载
    pub fn on_expired(&mut self, generation: u64) -> Option<Creative> {
        if self.state != SlotState::Loaded || generation != self.generation {
            return None;
        }
        self.clear()
    }

    /// 消费：所有权交给调用方，slot 回到 Idle
    pub fn take(&mut self) -> Option<Creative> {
        if self.creative.is_none() {
            return None;
        }
        self.clear()
    }

    /// 直接放入一个 creative（next-ad 缓存回填、宿主保存的 banner）。
    /// 在飞的请求会因为 generation 变化而作废。返回被替换掉的旧 creative。
    pub fn put(&mut self, creative: Creative, now: Instant) -> (ExpiryTimer, Option<Creative>) {
        let previous = self.creative.take();
        self.generation += 1;
        (self.store(creative, now), previous)
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// 取消暂停；返回是否需要立刻加载（没有 creative 且不在加载中）
    pub fn resume(&mut self) -> bool {
        self.paused = false;
        self.creative.is_none() && self.state != SlotState::Loading
    }

    /// 销毁：丢弃 creative 和在飞请求，重置计数
    pub fn destroy(&mut self) -> Option<Creative> {
        self.retry_count = 0;
        self.state = SlotState::Idle;
        self.expiry_deadline = None;
        self.generation += 1;
        self.creative.take()
    }

    fn store(&mut self, creative: Creative, now: Instant) -> ExpiryTimer {
        let deadline = now + CREATIVE_TTL;
        self.creative = Some(creative);
        self.retry_count = 0;
        self.state = SlotState::Loaded;
        self.expiry_deadline = Some(deadline);
        ExpiryTimer {
            generation: self.generation,
            deadline,
        }
    }

    fn clear(&mut self) -> Option<Creative> {
        self.state = SlotState::Idle;
        self.expiry_deadline = None;
        self.generation += 1;
        self.creative.take()
    }
}
