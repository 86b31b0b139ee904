// src/orchestrator/actor.rs

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::snapshot::{CREATIVE_TTL, LOAD_AND_SHOW_ESCALATION_DELAY, POLL_TICK};
use crate::config::{ConfigSnapshot, FormatSettings};
use crate::error::LoadError;
use crate::inventory::{
    BackoffPolicy, FailureOutcome, LoadTicket, PlacementResolver, UnitSlot, UnitSource,
    Waterfall,
};
use crate::model::creative::{Creative, CreativeInfo, Reward};
use crate::model::placements::{AdFormat, Floor, PlacementKey, UnitId};
use crate::network::PresentEvent;
use crate::orchestrator::runtime::Mailbox;
use crate::orchestrator::{
    AdState, Collaborators, LoadAndShowOptions, ShowOutcome, ShowTicket, SkipReason,
    WaterfallSlotInfo,
};

/// 失败后的重试模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryModel {
    /// 高 floor 失败降级一次到低 floor，低 floor 失败计入 `max_low_floor_failures`
    Escalate,
    /// 同一单元按退避策略重试（banner）
    Backoff,
}

/// 每个格式的差异点
#[derive(Debug, Clone, Copy)]
pub(crate) struct FormatRules {
    pub format: AdFormat,
    pub retry: RetryModel,
    /// 是否支持全屏展示协议
    pub showable: bool,
    /// 点击即视为展示结束（插屏）
    pub finish_on_click: bool,
    /// 预加载按 FIFO 串行执行（原生）
    pub sequential_preload: bool,
    pub supports_waterfall: bool,
}

pub(crate) enum Command {
    Init,
    Preload(PlacementKey),
    IsLoaded(PlacementKey, oneshot::Sender<bool>),
    Peek(PlacementKey, oneshot::Sender<Option<CreativeInfo>>),
    Consume(PlacementKey, oneshot::Sender<Option<Creative>>),
    AdState(PlacementKey, oneshot::Sender<AdState>),
    LoadAndShow {
        key: PlacementKey,
        options: LoadAndShowOptions,
        reply: oneshot::Sender<ShowOutcome>,
    },
    Show {
        key: PlacementKey,
        wait: bool,
        reply: oneshot::Sender<ShowOutcome>,
    },
    Save(PlacementKey, Creative),
    DestroyAd(PlacementKey),
    Collapsible(PlacementKey, oneshot::Sender<Option<String>>),
    WaterfallSlots(oneshot::Sender<Vec<WaterfallSlotInfo>>),
    Pause,
    Resume,
    DestroyAll,
    Reload(Arc<ConfigSnapshot>),
    Shutdown,

    UnitLoaded {
        unit_id: UnitId,
        generation: u64,
        result: Result<Creative, LoadError>,
    },
    UnitRetry(UnitId),
    UnitExpired {
        unit_id: UnitId,
        generation: u64,
    },
    Escalate(PlacementKey),
    WaterfallStart {
        epoch: u64,
        index: usize,
    },
    WaterfallLoaded {
        epoch: u64,
        index: usize,
        generation: u64,
        result: Result<Creative, LoadError>,
    },
    WaterfallRetry {
        epoch: u64,
        index: usize,
    },
    WaterfallExpired {
        epoch: u64,
        index: usize,
        generation: u64,
    },
    SessionTimeout(u64),
    PollTick(u64),
    Present {
        id: u64,
        event: PresentEvent,
    },
    PresentEnded(u64),
}

/// 一个广告位的一条加载链：高 floor -> 低 floor -> (原生) 低 floor 重试
#[derive(Debug)]
struct Chain {
    unit: UnitId,
    floor: Floor,
    fail_count: u32,
}

#[derive(Debug, Default)]
struct PlacementState {
    last_shown_at: Option<Instant>,
    /// load_and_show 超时后迟到的素材
    next_ad: Option<Creative>,
    park_next: bool,
}

/// 等待加载完成后立即展示的 load_and_show 会话。
/// 会话从列表中移除即视为 adComplete，迟到的超时定时器找不到它就什么都不做。
struct Session {
    id: u64,
    key: PlacementKey,
    reply: oneshot::Sender<ShowOutcome>,
}

struct PollWait {
    id: u64,
    key: PlacementKey,
    ticks: u32,
    reply: oneshot::Sender<ShowOutcome>,
}

struct Showing {
    id: u64,
    key: PlacementKey,
    reply: Option<oneshot::Sender<ShowOutcome>>,
    clicked: bool,
    reward: Option<Reward>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    NextAd,
    Unit(UnitId),
    Waterfall(usize),
}

/// **单个格式的编排器 actor**
///
/// 独占该格式所有 slot、缓存和会话状态，只通过邮箱消息驱动：
/// 外部调用、上游回调、退避/降级/TTL/轮询定时器全部是消息，
/// 因此状态从不跨任务共享，也不需要锁。
pub(crate) struct FormatActor {
    rules: FormatRules,
    resolver: PlacementResolver,
    settings: FormatSettings,
    backoff: BackoffPolicy,
    collaborators: Collaborators,
    mailbox: Mailbox<Command>,
    units: HashMap<UnitId, UnitSlot>,
    waterfall: Option<Waterfall>,
    waterfall_epoch: u64,
    waterfall_started: bool,
    /// 还在等 ramp-up 启动消息的 slot 下标
    waterfall_ramp: HashSet<usize>,
    chains: HashMap<PlacementKey, Chain>,
    queue: VecDeque<PlacementKey>,
    queue_active: Option<PlacementKey>,
    placements: HashMap<PlacementKey, PlacementState>,
    sessions: Vec<Session>,
    polls: Vec<PollWait>,
    showing: Option<Showing>,
    paused: bool,
    next_id: u64,
}

impl FormatActor {
    fn new(
        rules: FormatRules,
        snapshot: Arc<ConfigSnapshot>,
        collaborators: Collaborators,
        mailbox: Mailbox<Command>,
    ) -> Self {
        let resolver = PlacementResolver::new(rules.format, snapshot.clone());
        let waterfall = (rules.supports_waterfall && snapshot.waterfall.enabled)
            .then(|| Waterfall::build(&resolver));
        Self {
            rules,
            settings: snapshot.settings(rules.format),
            backoff: BackoffPolicy::from(snapshot.reload_time),
            resolver,
            collaborators,
            mailbox,
            units: HashMap::new(),
            waterfall,
            waterfall_epoch: 0,
            waterfall_started: false,
            waterfall_ramp: HashSet::new(),
            chains: HashMap::new(),
            queue: VecDeque::new(),
            queue_active: None,
            placements: HashMap::new(),
            sessions: Vec::new(),
            polls: Vec::new(),
            showing: None,
            paused: false,
            next_id: 0,
        }
    }

    async fn run(mut self, mut rx: UnboundedReceiver<Command>) {
        info!(format = %self.rules.format, waterfall = self.waterfall.is_some(), "orchestrator started");
        while let Some(cmd) = rx.recv().await {
            if matches!(cmd, Command::Shutdown) {
                break;
            }
            self.handle(cmd);
        }
        self.destroy_all();
        info!(format = %self.rules.format, "orchestrator stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Init => self.init(),
            Command::Preload(key) => self.preload(&key),
            Command::IsLoaded(key, reply) => {
                let _ = reply.send(self.available_for(&key).is_some());
            }
            Command::Peek(key, reply) => {
                let _ = reply.send(self.peek_for(&key).map(Creative::info));
            }
            Command::Consume(key, reply) => {
                let creative = self.take_for(&key);
                if let Some(creative) = reply.send(creative).err().flatten() {
                    // 调用方已经不在了，素材交还上游
                    self.collaborators.network.release(creative);
                }
            }
            Command::AdState(key, reply) => {
                let _ = reply.send(self.ad_state(&key));
            }
            Command::LoadAndShow {
                key,
                options,
                reply,
            } => self.load_and_show(key, options, reply),
            Command::Show { key, wait, reply } => self.show(key, wait, reply),
            Command::Save(key, creative) => self.save(&key, creative),
            Command::DestroyAd(key) => self.destroy_ad(&key),
            Command::Collapsible(key, reply) => {
                let position = self.resolver.snapshot().banner_collapsible.get(&key).cloned();
                let _ = reply.send(position);
            }
            Command::WaterfallSlots(reply) => {
                let _ = reply.send(self.waterfall_slots());
            }
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::DestroyAll => self.destroy_all(),
            Command::Reload(snapshot) => self.reload(snapshot),
            Command::Shutdown => {}

            Command::UnitLoaded {
                unit_id,
                generation,
                result,
            } => match result {
                Ok(creative) => self.on_unit_loaded(unit_id, generation, creative),
                Err(error) => self.on_unit_failed(unit_id, generation, error),
            },
            Command::UnitRetry(unit_id) => {
                if self.ads_blocked() {
                    if let Some(slot) = self.units.get_mut(&unit_id) {
                        slot.abandon_retry();
                    }
                    debug!(format = %self.rules.format, unit_id = %unit_id, "retry dropped, ads blocked");
                    return;
                }
                let ticket = self.units.get_mut(&unit_id).and_then(UnitSlot::retry_due);
                match ticket {
                    Some(ticket) => self.request_unit(ticket),
                    None => debug!(format = %self.rules.format, unit_id = %unit_id, "retry dropped"),
                }
            }
            Command::UnitExpired {
                unit_id,
                generation,
            } => self.on_unit_expired(unit_id, generation),
            Command::Escalate(key) => {
                if self.chains.contains_key(&key) {
                    self.load(&key, false);
                }
            }
            Command::WaterfallStart { epoch, index } => {
                if epoch == self.waterfall_epoch {
                    self.waterfall_ramp.remove(&index);
                    self.waterfall_load(index);
                    if self.waterfall_exhausted() {
                        self.fail_sessions(None, ShowOutcome::LoadFailed);
                    }
                }
            }
            Command::WaterfallLoaded {
                epoch,
                index,
                generation,
                result,
            } => {
                if epoch != self.waterfall_epoch {
                    if let Ok(creative) = result {
                        self.collaborators.network.release(creative);
                    }
                    return;
                }
                match result {
                    Ok(creative) => self.on_waterfall_loaded(index, generation, creative),
                    Err(error) => self.on_waterfall_failed(index, generation, error),
                }
            }
            Command::WaterfallRetry { epoch, index } => {
                if epoch != self.waterfall_epoch {
                    return;
                }
                if self.ads_blocked() {
                    if let Some(waterfall) = self.waterfall.as_mut() {
                        waterfall.abandon_retry(index);
                    }
                    return;
                }
                let ticket = self.waterfall.as_mut().and_then(|wf| wf.retry_due(index));
                if let Some(ticket) = ticket {
                    self.request_waterfall(index, ticket);
                }
            }
            Command::WaterfallExpired {
                epoch,
                index,
                generation,
            } => {
                if epoch != self.waterfall_epoch {
                    return;
                }
                let expired = self
                    .waterfall
                    .as_mut()
                    .and_then(|wf| wf.on_expired(index, generation));
                if let Some(creative) = expired {
                    info!(format = %self.rules.format, slot = index, "waterfall creative expired");
                    self.collaborators.network.release(creative);
                    self.waterfall_load(index);
                }
            }
            Command::SessionTimeout(id) => self.on_session_timeout(id),
            Command::PollTick(id) => self.on_poll_tick(id),
            Command::Present { id, event } => self.on_present(id, event),
            Command::PresentEnded(id) => {
                if self.showing.as_ref().is_some_and(|s| s.id == id) {
                    self.on_present(
                        id,
                        PresentEvent::FailedToShow("presentation ended without dismissal".into()),
                    );
                }
            }
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn placement(&mut self, key: &PlacementKey) -> &mut PlacementState {
        self.placements.entry(key.clone()).or_default()
    }

    /// 全局关闭广告或点击限制期间不向上游发任何请求
    fn ads_blocked(&self) -> bool {
        self.resolver.snapshot().ads_disabled || self.collaborators.guard.ads_suppressed()
    }

    fn init(&mut self) {
        if self.waterfall.is_some() {
            self.start_waterfall();
        }
    }

    // ---------- 预加载 / 加载链 ----------

    fn preload(&mut self, key: &PlacementKey) {
        if self.ads_blocked() {
            debug!(format = %self.rules.format, placement = %key, "preload ignored, ads blocked");
            return;
        }
        if self.waterfall.is_some() {
            if self.rules.sequential_preload {
                debug!(format = %self.rules.format, placement = %key, "preload ignored, waterfall enabled");
            } else {
                self.start_waterfall();
            }
            return;
        }
        if self.restore_next_ad(key) {
            return;
        }
        if self.rules.sequential_preload {
            if self.queue_active.as_ref() == Some(key)
                || self.queue.contains(key)
                || self.available_for(key).is_some()
            {
                return;
            }
            self.queue.push_back(key.clone());
            self.pump_queue();
        } else {
            self.start_chain(key, true);
        }
    }

    /// 后台补货；不预加载的广告位跳过
    fn refill(&mut self, key: &PlacementKey) {
        if self.resolver.snapshot().is_preload_disabled(key) {
            debug!(format = %self.rules.format, placement = %key, "refill skipped, placement not preloaded");
            return;
        }
        self.preload(key);
    }

    fn pump_queue(&mut self) {
        while self.queue_active.is_none() {
            let Some(key) = self.queue.pop_front() else {
                break;
            };
            self.queue_active = Some(key.clone());
            self.start_chain(&key, true);
        }
    }

    fn start_chain(&mut self, key: &PlacementKey, prefer_high: bool) {
        if self.chains.contains_key(key) {
            return;
        }
        self.chains.insert(
            key.clone(),
            Chain {
                unit: UnitId::empty(),
                floor: Floor::from_high(prefer_high),
                fail_count: 0,
            },
        );
        let high = prefer_high && self.rules.retry == RetryModel::Escalate;
        self.load(key, high);
    }

    /// 解析单元并发起请求；已缓存或已在加载时直接返回（去重）
    fn load(&mut self, key: &PlacementKey, high: bool) {
        if self.ads_blocked() {
            debug!(format = %self.rules.format, placement = %key, "load dropped, ads blocked");
            self.finish_chain(key, false);
            return;
        }
        let unit = self.resolver.resolve(key, high);
        let floor = Floor::from_high(high && self.resolver.has_distinct_high_floor(key));
        if unit.is_empty() {
            debug!(format = %self.rules.format, placement = %key, "no unit id resolved, skipping load");
            self.finish_chain(key, false);
            return;
        }
        if let Some(chain) = self.chains.get_mut(key) {
            chain.unit = unit.clone();
            chain.floor = floor;
        }

        let paused = self.paused;
        let slot = self.units.entry(unit.clone()).or_insert_with(|| {
            let mut slot = UnitSlot::fixed(key.as_str(), unit.clone(), floor);
            if paused {
                slot.pause();
            }
            slot
        });
        if slot.has_creative() {
            self.finish_chain(key, true);
            self.serve_sessions();
            return;
        }
        if slot.is_loading() {
            debug!(format = %self.rules.format, placement = %key, unit_id = %unit, "load already in flight");
            return;
        }
        match slot.begin_load() {
            Some(ticket) => self.request_unit(ticket),
            None => self.finish_chain(key, false),
        }
    }

    fn request_unit(&mut self, ticket: LoadTicket) {
        debug!(
            format = %self.rules.format,
            unit_id = %ticket.unit_id,
            generation = ticket.generation,
            "requesting ad unit"
        );
        let future = self
            .collaborators
            .network
            .request(self.rules.format, &ticket.unit_id);
        let LoadTicket {
            unit_id,
            generation,
        } = ticket;
        self.mailbox.complete(future, move |result| Command::UnitLoaded {
            unit_id,
            generation,
            result,
        });
    }

    fn chains_on(&self, unit: &UnitId) -> Vec<PlacementKey> {
        self.chains
            .iter()
            .filter(|(_, chain)| &chain.unit == unit)
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn on_unit_loaded(&mut self, unit: UnitId, generation: u64, creative: Creative) {
        let outcome = match self.units.get_mut(&unit) {
            Some(slot) => slot.on_loaded(generation, creative, Instant::now()),
            None => Err(creative),
        };
        let timer = match outcome {
            Ok(timer) => timer,
            Err(stale) => {
                debug!(format = %self.rules.format, unit_id = %unit, "stale load completion released");
                self.collaborators.network.release(stale);
                return;
            }
        };
        info!(format = %self.rules.format, unit_id = %unit, "ad loaded");
        self.mailbox.post_at(
            timer.deadline,
            Command::UnitExpired {
                unit_id: unit.clone(),
                generation: timer.generation,
            },
        );
        for key in self.chains_on(&unit) {
            self.finish_chain(&key, true);
        }
        self.serve_sessions();
        self.park_late_creatives();
    }

    fn on_unit_failed(&mut self, unit: UnitId, generation: u64, error: LoadError) {
        match self.rules.retry {
            RetryModel::Backoff => {
                let outcome = match self.units.get_mut(&unit) {
                    Some(slot) => slot.on_failed(
                        generation,
                        &self.backoff,
                        self.settings.max_low_floor_failures,
                    ),
                    None => FailureOutcome::Stale,
                };
                match outcome {
                    FailureOutcome::Retry { delay, retry_count } => {
                        warn!(
                            format = %self.rules.format,
                            unit_id = %unit,
                            retry = retry_count,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "ad load failed, retry scheduled"
                        );
                        self.mailbox.post_after(delay, Command::UnitRetry(unit));
                    }
                    FailureOutcome::Terminal => {
                        warn!(format = %self.rules.format, unit_id = %unit, error = %error, "ad load failed, giving up");
                        for key in self.chains_on(&unit) {
                            self.finish_chain(&key, false);
                        }
                    }
                    FailureOutcome::Stale => {}
                }
            }
            RetryModel::Escalate => {
                let current = self
                    .units
                    .get_mut(&unit)
                    .is_some_and(|slot| slot.fail_terminal(generation));
                if !current {
                    return;
                }
                warn!(format = %self.rules.format, unit_id = %unit, error = %error, "ad load failed");
                for key in self.chains_on(&unit) {
                    self.escalate_or_give_up(&key);
                }
            }
        }
    }

    /// 高 floor 失败：等一会儿降级一次；低 floor 失败：计数，超过预算放弃
    fn escalate_or_give_up(&mut self, key: &PlacementKey) {
        let waiting = self.sessions.iter().any(|s| &s.key == key);
        let Some(chain) = self.chains.get_mut(key) else {
            return;
        };
        if chain.floor.is_high() {
            chain.floor = Floor::Low;
            let delay = if waiting {
                LOAD_AND_SHOW_ESCALATION_DELAY
            } else {
                self.settings.escalation_delay
            };
            info!(
                format = %self.rules.format,
                placement = %key,
                delay_ms = delay.as_millis() as u64,
                "high floor failed, escalating to low floor"
            );
            self.mailbox.post_after(delay, Command::Escalate(key.clone()));
            return;
        }
        chain.fail_count += 1;
        let fail_count = chain.fail_count;
        if fail_count < self.settings.max_low_floor_failures && !self.paused {
            debug!(format = %self.rules.format, placement = %key, retry = fail_count, "retrying low floor");
            self.mailbox
                .post_after(self.settings.escalation_delay, Command::Escalate(key.clone()));
        } else {
            warn!(format = %self.rules.format, placement = %key, retry = fail_count, "low floor failed, giving up");
            self.finish_chain(key, false);
        }
    }

    fn finish_chain(&mut self, key: &PlacementKey, success: bool) {
        self.chains.remove(key);
        if !success {
            self.fail_sessions(Some(key), ShowOutcome::LoadFailed);
            if let Some(state) = self.placements.get_mut(key) {
                state.park_next = false;
            }
        }
        if self.queue_active.as_ref() == Some(key) {
            self.queue_active = None;
            self.pump_queue();
        }
    }

    fn on_unit_expired(&mut self, unit: UnitId, generation: u64) {
        let Some(slot) = self.units.get_mut(&unit) else {
            return;
        };
        let Some(creative) = slot.on_expired(generation) else {
            return;
        };
        let key = PlacementKey::from(slot.name());
        info!(format = %self.rules.format, placement = %key, unit_id = %unit, "creative expired, refreshing");
        self.collaborators.network.release(creative);
        if self.resolver.snapshot().is_preload_disabled(&key) || self.ads_blocked() {
            return;
        }
        let ticket = self.units.get_mut(&unit).and_then(UnitSlot::begin_load);
        if let Some(ticket) = ticket {
            self.request_unit(ticket);
        }
    }

    /// 把 next-ad 缓存挪回 slot，不发网络请求
    fn restore_next_ad(&mut self, key: &PlacementKey) -> bool {
        let Some(creative) = self.placements.get_mut(key).and_then(|p| p.next_ad.take()) else {
            return false;
        };
        if creative.loaded_at().elapsed() >= CREATIVE_TTL {
            self.collaborators.network.release(creative);
            return false;
        }
        let unit = creative.unit_id().clone();
        let paused = self.paused;
        let slot = self.units.entry(unit.clone()).or_insert_with(|| {
            let mut slot = UnitSlot::fixed(key.as_str(), unit.clone(), Floor::Low);
            if paused {
                slot.pause();
            }
            slot
        });
        let (timer, previous) = slot.put(creative, Instant::now());
        debug!(format = %self.rules.format, placement = %key, unit_id = %unit, "next-ad creative moved into cache");
        self.mailbox.post_at(
            timer.deadline,
            Command::UnitExpired {
                unit_id: unit,
                generation: timer.generation,
            },
        );
        if let Some(previous) = previous {
            self.collaborators.network.release(previous);
        }
        true
    }

    /// load_and_show 超时后迟到的素材放进 next-ad 缓存
    fn park_late_creatives(&mut self) {
        let keys: Vec<PlacementKey> = self
            .placements
            .iter()
            .filter(|(_, state)| state.park_next)
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            let Some(Source::Unit(unit)) = self.available_for(&key) else {
                continue;
            };
            let Some(creative) = self.units.get_mut(&unit).and_then(UnitSlot::take) else {
                continue;
            };
            info!(format = %self.rules.format, placement = %key, unit_id = %unit, "late creative parked for next show");
            let state = self.placement(&key);
            state.park_next = false;
            let previous = state.next_ad.replace(creative);
            if let Some(previous) = previous {
                self.collaborators.network.release(previous);
            }
        }
    }

    // ---------- 瀑布流 ----------

    fn start_waterfall(&mut self) {
        if self.waterfall_started || self.ads_blocked() {
            return;
        }
        let Some(waterfall) = &self.waterfall else {
            return;
        };
        self.waterfall_started = true;
        let ramp_up = self.resolver.snapshot().waterfall.ramp_up();
        info!(format = %self.rules.format, slots = waterfall.len(), "waterfall starting");
        self.waterfall_ramp = (0..waterfall.len()).collect();
        for index in 0..waterfall.len() {
            self.mailbox.post_after(
                ramp_up * index as u32,
                Command::WaterfallStart {
                    epoch: self.waterfall_epoch,
                    index,
                },
            );
        }
    }

    /// 尚未启动则启动；已启动则给每个空 slot 补一次加载
    fn kick_waterfall(&mut self) {
        if !self.waterfall_started {
            self.start_waterfall();
            return;
        }
        let len = self.waterfall.as_ref().map_or(0, Waterfall::len);
        for index in 0..len {
            self.waterfall_load(index);
        }
    }

    /// 没有 slot 在加载、排队重试或等待启动，也没有可用素材
    fn waterfall_exhausted(&self) -> bool {
        self.waterfall_ramp.is_empty()
            && self
                .waterfall
                .as_ref()
                .is_some_and(|wf| !wf.any_pending() && !wf.has_available())
    }

    fn waterfall_load(&mut self, index: usize) {
        if self.ads_blocked() {
            return;
        }
        let ticket = self.waterfall.as_mut().and_then(|wf| wf.begin_load(index));
        if let Some(ticket) = ticket {
            self.request_waterfall(index, ticket);
        }
    }

    fn request_waterfall(&mut self, index: usize, ticket: LoadTicket) {
        debug!(format = %self.rules.format, slot = index, unit_id = %ticket.unit_id, "requesting waterfall unit");
        let future = self
            .collaborators
            .network
            .request(self.rules.format, &ticket.unit_id);
        let epoch = self.waterfall_epoch;
        let generation = ticket.generation;
        self.mailbox.complete(future, move |result| Command::WaterfallLoaded {
            epoch,
            index,
            generation,
            result,
        });
    }

    fn on_waterfall_loaded(&mut self, index: usize, generation: u64, creative: Creative) {
        let outcome = match self.waterfall.as_mut() {
            Some(wf) => wf.on_loaded(index, generation, creative, Instant::now()),
            None => Err(creative),
        };
        match outcome {
            Ok(timer) => {
                info!(format = %self.rules.format, slot = index, "waterfall ad loaded");
                self.mailbox.post_at(
                    timer.deadline,
                    Command::WaterfallExpired {
                        epoch: self.waterfall_epoch,
                        index,
                        generation: timer.generation,
                    },
                );
                self.serve_sessions();
            }
            Err(stale) => self.collaborators.network.release(stale),
        }
    }

    fn on_waterfall_failed(&mut self, index: usize, generation: u64, error: LoadError) {
        let Some(waterfall) = self.waterfall.as_mut() else {
            return;
        };
        match waterfall.on_failed(index, generation) {
            FailureOutcome::Retry { delay, retry_count } => {
                warn!(
                    format = %self.rules.format,
                    slot = index,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "waterfall load failed, retry scheduled"
                );
                self.mailbox.post_after(
                    delay,
                    Command::WaterfallRetry {
                        epoch: self.waterfall_epoch,
                        index,
                    },
                );
            }
            FailureOutcome::Terminal => {
                warn!(format = %self.rules.format, slot = index, error = %error, "waterfall slot gave up");
                if self.waterfall_exhausted() {
                    self.fail_sessions(None, ShowOutcome::LoadFailed);
                }
            }
            FailureOutcome::Stale => {}
        }
    }

    fn waterfall_slots(&self) -> Vec<WaterfallSlotInfo> {
        let Some(waterfall) = &self.waterfall else {
            return Vec::new();
        };
        waterfall
            .slots()
            .iter()
            .map(|slot| WaterfallSlotInfo {
                name: slot.name().to_string(),
                state: format!("{:?}", slot.state()),
                retry_count: slot.retry_count(),
                creative: slot.peek().map(Creative::info),
                chosen: slot.source().chosen_name().map(str::to_string),
            })
            .collect()
    }

    // ---------- 查询 / 消费 ----------

    fn available_for(&self, key: &PlacementKey) -> Option<Source> {
        let next_ad_fresh = self
            .placements
            .get(key)
            .and_then(|p| p.next_ad.as_ref())
            .is_some_and(|c| c.loaded_at().elapsed() < CREATIVE_TTL);
        if next_ad_fresh {
            return Some(Source::NextAd);
        }
        if let Some(waterfall) = &self.waterfall {
            return waterfall.get_available().map(|(index, _)| Source::Waterfall(index));
        }
        self.resolver
            .lookup_order(key)
            .into_iter()
            .find(|unit| self.units.get(unit).is_some_and(UnitSlot::has_creative))
            .map(Source::Unit)
    }

    fn peek_for(&self, key: &PlacementKey) -> Option<&Creative> {
        match self.available_for(key)? {
            Source::NextAd => self.placements.get(key)?.next_ad.as_ref(),
            Source::Unit(unit) => self.units.get(&unit)?.peek(),
            Source::Waterfall(index) => self.waterfall.as_ref()?.slot(index)?.peek(),
        }
    }

    /// 消费：转移所有权并立即补货
    fn take_for(&mut self, key: &PlacementKey) -> Option<Creative> {
        let creative = match self.available_for(key)? {
            Source::NextAd => self.placements.get_mut(key)?.next_ad.take(),
            Source::Unit(unit) => {
                let creative = self.units.get_mut(&unit)?.take();
                self.refill(key);
                creative
            }
            Source::Waterfall(index) => {
                let creative = self.waterfall.as_mut()?.take(index);
                self.waterfall_load(index);
                creative
            }
        };
        if let Some(creative) = &creative {
            debug!(format = %self.rules.format, placement = %key, unit_id = %creative.unit_id(), "creative consumed");
        }
        creative
    }

    fn pending_for(&self, key: &PlacementKey) -> bool {
        if let Some(waterfall) = &self.waterfall {
            return waterfall.any_pending();
        }
        self.chains.contains_key(key)
            || self.queue.contains(key)
            || self
                .resolver
                .lookup_order(key)
                .iter()
                .any(|unit| self.units.get(unit).is_some_and(UnitSlot::is_pending))
    }

    fn ad_state(&self, key: &PlacementKey) -> AdState {
        if self.available_for(key).is_some() {
            AdState::Loaded
        } else if self.pending_for(key) || self.polls.iter().any(|p| &p.key == key) {
            AdState::Waiting
        } else {
            AdState::NotLoaded
        }
    }

    // ---------- 展示协议 ----------

    fn skip_reason(&self, key: &PlacementKey, check_cooldown: bool) -> Option<SkipReason> {
        if self.resolver.snapshot().ads_disabled {
            return Some(SkipReason::AdsDisabled);
        }
        if self.collaborators.guard.ads_suppressed() {
            return Some(SkipReason::ClickSuppressed);
        }
        if self.showing.is_some()
            || self.sessions.iter().any(|s| &s.key == key)
            || self.polls.iter().any(|p| &p.key == key)
        {
            return Some(SkipReason::AlreadyShowing);
        }
        if check_cooldown {
            let last = self.placements.get(key).and_then(|p| p.last_shown_at);
            if last.is_some_and(|at| at.elapsed() < self.settings.cooldown) {
                return Some(SkipReason::Cooldown);
            }
        }
        None
    }

    fn load_and_show(
        &mut self,
        key: PlacementKey,
        options: LoadAndShowOptions,
        reply: oneshot::Sender<ShowOutcome>,
    ) {
        if !self.rules.showable {
            let _ = reply.send(ShowOutcome::Unavailable);
            return;
        }
        if let Some(reason) = self.skip_reason(&key, true) {
            info!(format = %self.rules.format, placement = %key, ?reason, "load and show skipped");
            let _ = reply.send(ShowOutcome::skipped(reason));
            return;
        }
        if self.available_for(&key).is_some() {
            self.present_for(&key, reply);
            return;
        }

        self.collaborators.indicator.show(self.rules.format, &key);
        let id = self.next_id();
        if let Some(timeout) = options.timeout {
            self.mailbox.post_after(timeout, Command::SessionTimeout(id));
        }
        self.sessions.push(Session {
            id,
            key: key.clone(),
            reply,
        });
        info!(format = %self.rules.format, placement = %key, session = id, "load and show started");

        if self.waterfall.is_some() {
            self.kick_waterfall();
            if self.waterfall_exhausted() {
                self.fail_sessions(Some(&key), ShowOutcome::LoadFailed);
            }
        } else {
            self.start_chain(&key, options.prefer_high_floor);
        }
    }

    fn show(&mut self, key: PlacementKey, wait: bool, reply: oneshot::Sender<ShowOutcome>) {
        if !self.rules.showable {
            let _ = reply.send(ShowOutcome::Unavailable);
            return;
        }
        if let Some(reason) = self.skip_reason(&key, false) {
            info!(format = %self.rules.format, placement = %key, ?reason, "show skipped");
            let _ = reply.send(ShowOutcome::skipped(reason));
            return;
        }
        if self.available_for(&key).is_some() {
            self.present_for(&key, reply);
            return;
        }
        if wait && self.pending_for(&key) {
            self.collaborators.indicator.show(self.rules.format, &key);
            let id = self.next_id();
            self.polls.push(PollWait {
                id,
                key: key.clone(),
                ticks: 0,
                reply,
            });
            debug!(format = %self.rules.format, placement = %key, "waiting for in-flight load");
            self.mailbox.post_after(POLL_TICK, Command::PollTick(id));
            return;
        }
        let _ = reply.send(ShowOutcome::Unavailable);
        self.preload(&key);
    }

    fn serve_sessions(&mut self) {
        let mut i = 0;
        while i < self.sessions.len() {
            if self.showing.is_some() {
                break;
            }
            let key = self.sessions[i].key.clone();
            if self.available_for(&key).is_some() {
                let session = self.sessions.remove(i);
                self.collaborators.indicator.dismiss(self.rules.format, &key);
                self.placement(&key).park_next = false;
                self.present_for(&key, session.reply);
            } else {
                i += 1;
            }
        }
    }

    /// `key` 为 None 时作用于所有会话（瀑布流不区分广告位）
    fn fail_sessions(&mut self, key: Option<&PlacementKey>, outcome: ShowOutcome) {
        let (failed, kept): (Vec<Session>, Vec<Session>) = std::mem::take(&mut self.sessions)
            .into_iter()
            .partition(|s| key.map_or(true, |key| &s.key == key));
        self.sessions = kept;
        for session in failed {
            self.collaborators
                .indicator
                .dismiss(self.rules.format, &session.key);
            info!(format = %self.rules.format, placement = %session.key, session = session.id, ?outcome, "load and show finished without ad");
            let _ = session.reply.send(outcome.clone());
        }
    }

    fn on_session_timeout(&mut self, id: u64) {
        let Some(pos) = self.sessions.iter().position(|s| s.id == id) else {
            return;
        };
        let session = self.sessions.remove(pos);
        self.collaborators
            .indicator
            .dismiss(self.rules.format, &session.key);
        info!(format = %self.rules.format, placement = %session.key, session = id, "load and show timed out");
        if self.waterfall.is_none() {
            self.placement(&session.key).park_next = true;
        }
        let _ = session.reply.send(ShowOutcome::TimedOut);
    }

    fn on_poll_tick(&mut self, id: u64) {
        let Some(pos) = self.polls.iter().position(|p| p.id == id) else {
            return;
        };
        let key = self.polls[pos].key.clone();
        if self.showing.is_none() && self.available_for(&key).is_some() {
            let poll = self.polls.remove(pos);
            self.collaborators.indicator.dismiss(self.rules.format, &key);
            self.present_for(&key, poll.reply);
            return;
        }
        let poll = &mut self.polls[pos];
        poll.ticks += 1;
        if poll.ticks >= self.settings.poll_timeout_ticks {
            let poll = self.polls.remove(pos);
            self.collaborators.indicator.dismiss(self.rules.format, &key);
            info!(format = %self.rules.format, placement = %key, ticks = poll.ticks, "show poll timed out");
            let _ = poll.reply.send(ShowOutcome::TimedOut);
        } else {
            self.mailbox.post_after(POLL_TICK, Command::PollTick(id));
        }
    }

    fn present_for(&mut self, key: &PlacementKey, reply: oneshot::Sender<ShowOutcome>) {
        let Some(creative) = self.take_for(key) else {
            let _ = reply.send(ShowOutcome::Unavailable);
            return;
        };
        let id = self.next_id();
        info!(
            format = %self.rules.format,
            placement = %key,
            unit_id = %creative.unit_id(),
            creative_id = %creative.id(),
            "presenting ad"
        );
        let events = self.collaborators.network.present(creative);
        self.mailbox.forward(
            events,
            move |event| Command::Present { id, event },
            Command::PresentEnded(id),
        );
        self.showing = Some(Showing {
            id,
            key: key.clone(),
            reply: Some(reply),
            clicked: false,
            reward: None,
        });
    }

    fn on_present(&mut self, id: u64, event: PresentEvent) {
        let Some(showing) = self.showing.as_mut().filter(|s| s.id == id) else {
            return;
        };
        match event {
            PresentEvent::Shown => {
                debug!(format = %self.rules.format, placement = %showing.key, "ad shown");
            }
            PresentEvent::Clicked => {
                self.collaborators.guard.notify_click();
                showing.clicked = true;
                info!(format = %self.rules.format, placement = %showing.key, "ad clicked");
                if self.rules.finish_on_click {
                    if let Some(reply) = showing.reply.take() {
                        let _ = reply.send(ShowOutcome::Clicked);
                    }
                }
            }
            PresentEvent::RewardEarned(reward) => {
                info!(format = %self.rules.format, placement = %showing.key, kind = %reward.kind, amount = reward.amount, "reward earned");
                showing.reward = Some(reward);
            }
            PresentEvent::Dismissed => {
                let Some(showing) = self.showing.take() else {
                    return;
                };
                self.placement(&showing.key).last_shown_at = Some(Instant::now());
                info!(format = %self.rules.format, placement = %showing.key, clicked = showing.clicked, "ad dismissed");
                if let Some(reply) = showing.reply {
                    let _ = reply.send(ShowOutcome::Dismissed {
                        clicked: showing.clicked,
                        reward: showing.reward,
                    });
                }
                self.refill(&showing.key);
                self.serve_sessions();
            }
            PresentEvent::FailedToShow(reason) => {
                let Some(showing) = self.showing.take() else {
                    return;
                };
                warn!(format = %self.rules.format, placement = %showing.key, %reason, "ad failed to show");
                if let Some(reply) = showing.reply {
                    let _ = reply.send(ShowOutcome::ShowFailed { reason });
                }
                self.refill(&showing.key);
                self.serve_sessions();
            }
        }
    }

    // ---------- banner ----------

    /// 宿主自己创建的素材放进缓存
    fn save(&mut self, key: &PlacementKey, creative: Creative) {
        let unit = self.resolver.resolve(key, false);
        if unit.is_empty() {
            warn!(format = %self.rules.format, placement = %key, "save ignored, no unit id resolved");
            self.collaborators.network.release(creative);
            return;
        }
        let paused = self.paused;
        let slot = self.units.entry(unit.clone()).or_insert_with(|| {
            let mut slot = UnitSlot::fixed(key.as_str(), unit.clone(), Floor::Low);
            if paused {
                slot.pause();
            }
            slot
        });
        let (timer, previous) = slot.put(creative, Instant::now());
        self.mailbox.post_at(
            timer.deadline,
            Command::UnitExpired {
                unit_id: unit,
                generation: timer.generation,
            },
        );
        if let Some(previous) = previous {
            self.collaborators.network.release(previous);
        }
    }

    fn destroy_ad(&mut self, key: &PlacementKey) {
        for unit in self.resolver.lookup_order(key) {
            if let Some(mut slot) = self.units.remove(&unit) {
                if let Some(creative) = slot.destroy() {
                    self.collaborators.network.release(creative);
                }
            }
        }
        self.chains.remove(key);
        debug!(format = %self.rules.format, placement = %key, "ad destroyed");
    }

    // ---------- 生命周期 ----------

    fn pause(&mut self) {
        self.paused = true;
        for slot in self.units.values_mut() {
            slot.pause();
        }
        if let Some(waterfall) = self.waterfall.as_mut() {
            waterfall.pause_all();
        }
        info!(format = %self.rules.format, "paused");
    }

    fn resume(&mut self) {
        self.paused = false;
        let units: Vec<UnitId> = self
            .units
            .iter_mut()
            .filter_map(|(unit, slot)| slot.resume().then(|| unit.clone()))
            .collect();
        if self.ads_blocked() {
            if let Some(waterfall) = self.waterfall.as_mut() {
                waterfall.resume_all();
            }
            info!(format = %self.rules.format, "resumed, loads skipped while ads blocked");
            return;
        }
        for unit in units {
            let ticket = self.units.get_mut(&unit).and_then(UnitSlot::begin_load);
            if let Some(ticket) = ticket {
                self.request_unit(ticket);
            }
        }
        let indices = self
            .waterfall
            .as_mut()
            .map(Waterfall::resume_all)
            .unwrap_or_default();
        if !indices.is_empty() {
            self.waterfall_started = true;
        }
        for index in indices {
            self.waterfall_load(index);
        }
        info!(format = %self.rules.format, "resumed");
    }

    fn destroy_all(&mut self) {
        let network = self.collaborators.network.clone();
        for (_, mut slot) in self.units.drain() {
            if let Some(creative) = slot.destroy() {
                network.release(creative);
            }
        }
        if let Some(waterfall) = self.waterfall.as_mut() {
            for creative in waterfall.destroy_all() {
                network.release(creative);
            }
            self.waterfall_epoch += 1;
            self.waterfall_started = false;
            self.waterfall_ramp.clear();
        }
        for state in self.placements.values_mut() {
            state.park_next = false;
            if let Some(creative) = state.next_ad.take() {
                network.release(creative);
            }
        }
        self.chains.clear();
        self.queue.clear();
        self.queue_active = None;
        self.fail_sessions(None, ShowOutcome::Aborted);
        for poll in std::mem::take(&mut self.polls) {
            self.collaborators.indicator.dismiss(self.rules.format, &poll.key);
            let _ = poll.reply.send(ShowOutcome::Aborted);
        }
        info!(format = %self.rules.format, "all ads destroyed");
    }

    fn reload(&mut self, snapshot: Arc<ConfigSnapshot>) {
        let format = self.rules.format;
        self.resolver = PlacementResolver::new(format, snapshot.clone());
        self.settings = snapshot.settings(format);
        self.backoff = BackoffPolicy::from(snapshot.reload_time);

        // 瀑布流按新配置整体重建，之前在跑的就重新启动
        let was_started = self.waterfall_started;
        if let Some(mut old) = self.waterfall.take() {
            for creative in old.destroy_all() {
                self.collaborators.network.release(creative);
            }
        }
        self.waterfall_epoch += 1;
        self.waterfall_started = false;
        self.waterfall_ramp.clear();
        if self.rules.supports_waterfall && snapshot.waterfall.enabled {
            let mut waterfall = Waterfall::build(&self.resolver);
            if self.paused {
                waterfall.pause_all();
            }
            self.waterfall = Some(waterfall);
            if was_started {
                self.start_waterfall();
            }
        } else {
            // 瀑布流被关掉，还在等的会话改走普通广告位加载
            let waiting: HashSet<PlacementKey> = self.sessions.iter().map(|s| s.key.clone()).collect();
            for key in waiting {
                self.start_chain(&key, false);
            }
        }
        info!(%format, waterfall = self.waterfall.is_some(), "config reloaded");
    }
}

/// **编排器 handle**
///
/// 只是一个邮箱发送端，`Clone` 很便宜。actor 停止后查询返回 `None`/默认值，
/// 展示请求返回 `Aborted`。
#[derive(Clone)]
pub struct FormatHandle {
    format: AdFormat,
    tx: UnboundedSender<Command>,
}

impl FormatHandle {
    pub(crate) fn spawn(
        rules: FormatRules,
        snapshot: Arc<ConfigSnapshot>,
        collaborators: Collaborators,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        let actor = FormatActor::new(rules, snapshot, collaborators, Mailbox::new(&tx));
        tokio::spawn(actor.run(rx));
        Self {
            format: rules.format,
            tx,
        }
    }

    pub fn format(&self) -> AdFormat {
        self.format
    }

    pub(crate) fn send(&self, cmd: Command) {
        if self.tx.send(cmd).is_err() {
            warn!(format = %self.format, "orchestrator is not running");
        }
    }

    pub(crate) fn ask<R, F>(&self, make: F) -> BoxFuture<'static, Option<R>>
    where
        R: Send + 'static,
        F: FnOnce(oneshot::Sender<R>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply));
        async move { rx.await.ok() }.boxed()
    }

    pub(crate) fn ticket<F>(&self, make: F) -> ShowTicket
    where
        F: FnOnce(oneshot::Sender<ShowOutcome>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply));
        ShowTicket::new(rx)
    }

    pub fn init(&self) {
        self.send(Command::Init);
    }

    pub fn preload(&self, key: &PlacementKey) {
        self.send(Command::Preload(key.clone()));
    }

    pub fn is_ad_loaded(&self, key: &PlacementKey) -> BoxFuture<'static, bool> {
        let key = key.clone();
        self.ask(|reply| Command::IsLoaded(key, reply))
            .map(|loaded| loaded.unwrap_or(false))
            .boxed()
    }

    pub fn loaded_ad(&self, key: &PlacementKey) -> BoxFuture<'static, Option<CreativeInfo>> {
        let key = key.clone();
        self.ask(|reply| Command::Peek(key, reply))
            .map(Option::flatten)
            .boxed()
    }

    pub fn consume(&self, key: &PlacementKey) -> BoxFuture<'static, Option<Creative>> {
        let key = key.clone();
        self.ask(|reply| Command::Consume(key, reply))
            .map(Option::flatten)
            .boxed()
    }

    pub fn ad_state(&self, key: &PlacementKey) -> BoxFuture<'static, AdState> {
        let key = key.clone();
        self.ask(|reply| Command::AdState(key, reply))
            .map(|state| state.unwrap_or(AdState::NotLoaded))
            .boxed()
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn destroy_all(&self) {
        self.send(Command::DestroyAll);
    }

    pub fn reload(&self, snapshot: Arc<ConfigSnapshot>) {
        self.send(Command::Reload(snapshot));
    }

    /// 停止 actor，释放所有缓存的素材
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }
}

/// 给各格式的 handle 批量实现 `AdManager` 和 `Loadable`
macro_rules! impl_format_handle {
    ($ty:ty) => {
        impl $crate::orchestrator::AdManager for $ty {
            fn format(&self) -> $crate::model::placements::AdFormat {
                self.handle.format()
            }

            fn init(&self) {
                self.handle.init();
            }

            fn destroy_all(&self) {
                self.handle.destroy_all();
            }

            fn pause(&self) {
                self.handle.pause();
            }

            fn resume(&self) {
                self.handle.resume();
            }

            fn reload(&self, snapshot: std::sync::Arc<$crate::config::ConfigSnapshot>) {
                self.handle.reload(snapshot);
            }

            fn is_ad_loaded(
                &self,
                key: &$crate::model::placements::PlacementKey,
            ) -> futures::future::BoxFuture<'static, bool> {
                self.handle.is_ad_loaded(key)
            }

            fn loaded_ad(
                &self,
                key: &$crate::model::placements::PlacementKey,
            ) -> futures::future::BoxFuture<'static, Option<$crate::model::creative::CreativeInfo>>
            {
                self.handle.loaded_ad(key)
            }
        }

        impl $crate::orchestrator::Loadable for $ty {
            fn preload(&self, key: &$crate::model::placements::PlacementKey) {
                self.handle.preload(key);
            }

            fn consume(
                &self,
                key: &$crate::model::placements::PlacementKey,
            ) -> futures::future::BoxFuture<'static, Option<$crate::model::creative::Creative>>
            {
                self.handle.consume(key)
            }

            fn ad_state(
                &self,
                key: &$crate::model::placements::PlacementKey,
            ) -> futures::future::BoxFuture<'static, $crate::orchestrator::AdState> {
                self.handle.ad_state(key)
            }
        }

        impl $ty {
            pub fn handle(&self) -> &$crate::orchestrator::FormatHandle {
                &self.handle
            }

            pub fn shutdown(&self) {
                self.handle.shutdown();
            }
        }
    };
}

/// 全屏格式额外实现 `Showable`
macro_rules! impl_showable {
    ($ty:ty) => {
        impl $crate::orchestrator::Showable for $ty {
            fn load_and_show(
                &self,
                key: &$crate::model::placements::PlacementKey,
                options: $crate::orchestrator::LoadAndShowOptions,
            ) -> $crate::orchestrator::ShowTicket {
                let key = key.clone();
                self.handle
                    .ticket(|reply| $crate::orchestrator::actor::Command::LoadAndShow {
                        key,
                        options,
                        reply,
                    })
            }

            fn show(
                &self,
                key: &$crate::model::placements::PlacementKey,
            ) -> $crate::orchestrator::ShowTicket {
                let key = key.clone();
                self.handle
                    .ticket(|reply| $crate::orchestrator::actor::Command::Show {
                        key,
                        wait: true,
                        reply,
                    })
            }

            fn show_if_available(
                &self,
                key: &$crate::model::placements::PlacementKey,
            ) -> $crate::orchestrator::ShowTicket {
                let key = key.clone();
                self.handle
                    .ticket(|reply| $crate::orchestrator::actor::Command::Show {
                        key,
                        wait: false,
                        reply,
                    })
            }
        }
    };
}

/// 支持瀑布流的格式额外实现 `WaterfallCapable`
macro_rules! impl_waterfall {
    ($ty:ty) => {
        impl $crate::orchestrator::WaterfallCapable for $ty {
            fn pause_waterfall(&self) {
                self.handle.pause();
            }

            fn resume_waterfall(&self) {
                self.handle.resume();
            }

            fn waterfall_slots(
                &self,
            ) -> futures::future::BoxFuture<'static, Vec<$crate::orchestrator::WaterfallSlotInfo>>
            {
                use futures::FutureExt;
                self.handle
                    .ask($crate::orchestrator::actor::Command::WaterfallSlots)
                    .map(Option::unwrap_or_default)
                    .boxed()
            }
        }
    };
}

pub(crate) use impl_format_handle;
pub(crate) use impl_showable;
pub(crate) use impl_waterfall;
