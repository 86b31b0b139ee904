#![allow(dead_code)]

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use ad_orchestrator::config::ConfigSnapshot;
use ad_orchestrator::error::LoadError;
use ad_orchestrator::guard::ClickGuard;
use ad_orchestrator::model::{
    AdFormat, BannerSize, Creative, CreativePayload, NativeAssets, PlacementKey, Reward, UnitId,
};
use ad_orchestrator::network::{AdNetwork, PresentEvent};
use ad_orchestrator::orchestrator::Collaborators;
use ad_orchestrator::ui::LoadingIndicator;

/// 某个单元下一次请求的结果
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Fill(Duration),
    Fail(Duration),
}

#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub format: AdFormat,
    pub unit_id: UnitId,
    pub at: Instant,
}

struct Script {
    steps: HashMap<UnitId, VecDeque<Step>>,
    fallback: Step,
    requests: Vec<RequestRecord>,
    presented: Vec<UnitId>,
    present_events: Vec<PresentEvent>,
    present_step: Duration,
}

/// 按单元脚本化的上游网络，记录每一次请求
pub struct ScriptedNetwork {
    script: Mutex<Script>,
    released: AtomicUsize,
}

impl ScriptedNetwork {
    fn with_fallback(fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script {
                steps: HashMap::new(),
                fallback,
                requests: Vec::new(),
                presented: Vec::new(),
                present_events: vec![PresentEvent::Shown, PresentEvent::Dismissed],
                present_step: Duration::from_millis(50),
            }),
            released: AtomicUsize::new(0),
        })
    }

    /// 没有脚本的单元在 `delay` 后填充
    pub fn filling(delay: Duration) -> Arc<Self> {
        Self::with_fallback(Step::Fill(delay))
    }

    /// 没有脚本的单元在 `delay` 后失败
    pub fn failing(delay: Duration) -> Arc<Self> {
        Self::with_fallback(Step::Fail(delay))
    }

    pub fn script(&self, unit: &str, steps: impl IntoIterator<Item = Step>) {
        let mut script = self.script.lock().unwrap();
        script
            .steps
            .entry(UnitId::from(unit))
            .or_default()
            .extend(steps);
    }

    pub fn set_present_events(&self, events: Vec<PresentEvent>) {
        self.script.lock().unwrap().present_events = events;
    }

    pub fn requests(&self) -> Vec<RequestRecord> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    pub fn requests_for(&self, unit: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.unit_id.as_str() == unit)
            .count()
    }

    pub fn requested_units(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|r| r.unit_id.to_string())
            .collect()
    }

    pub fn presented(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap()
            .presented
            .iter()
            .map(|u| u.to_string())
            .collect()
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

pub fn payload_for(format: AdFormat) -> CreativePayload {
    match format {
        AdFormat::Native => CreativePayload::Native(NativeAssets {
            headline: "scripted".to_string(),
            body: None,
            call_to_action: None,
            icon_url: None,
            image_url: None,
        }),
        AdFormat::Banner => CreativePayload::Banner(BannerSize {
            width: 320,
            height: 50,
        }),
        AdFormat::Interstitial => CreativePayload::Interstitial,
        AdFormat::AppOpen => CreativePayload::AppOpen,
        AdFormat::Rewarded => CreativePayload::Rewarded(Reward {
            kind: "coins".to_string(),
            amount: 5,
        }),
    }
}

impl AdNetwork for ScriptedNetwork {
    fn request(
        &self,
        format: AdFormat,
        unit_id: &UnitId,
    ) -> BoxFuture<'static, Result<Creative, LoadError>> {
        let step = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(RequestRecord {
                format,
                unit_id: unit_id.clone(),
                at: Instant::now(),
            });
            let fallback = script.fallback;
            script
                .steps
                .get_mut(unit_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or(fallback)
        };
        let unit_id = unit_id.clone();
        async move {
            match step {
                Step::Fill(delay) => {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    Ok(Creative::new(unit_id, payload_for(format)))
                }
                Step::Fail(delay) => {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    Err(LoadError::NoFill)
                }
            }
        }
        .boxed()
    }

    fn present(&self, creative: Creative) -> BoxStream<'static, PresentEvent> {
        let (events, step) = {
            let mut script = self.script.lock().unwrap();
            script.presented.push(creative.unit_id().clone());
            (script.present_events.clone(), script.present_step)
        };
        stream::iter(events)
            .then(move |event| async move {
                sleep(step).await;
                event
            })
            .boxed()
    }

    fn release(&self, _creative: Creative) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// 记录遮罩的显示 / 关闭次数
#[derive(Default)]
pub struct RecordingIndicator {
    shown: AtomicUsize,
    dismissed: AtomicUsize,
}

impl RecordingIndicator {
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn dismissed(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }
}

impl LoadingIndicator for RecordingIndicator {
    fn show(&self, _format: AdFormat, _key: &PlacementKey) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn dismiss(&self, _format: AdFormat, _key: &PlacementKey) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

/// 只计数点击，从不限制
#[derive(Default)]
pub struct CountingGuard {
    clicks: AtomicUsize,
}

impl CountingGuard {
    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }
}

impl ClickGuard for CountingGuard {
    fn notify_click(&self) {
        self.clicks.fetch_add(1, Ordering::SeqCst);
    }

    fn ads_suppressed(&self) -> bool {
        false
    }
}

pub fn key(value: &str) -> PlacementKey {
    PlacementKey::from(value)
}

pub fn unit(value: &str) -> UnitId {
    UnitId::from(value)
}

pub fn collaborators(network: &Arc<ScriptedNetwork>) -> Collaborators {
    Collaborators::new(network.clone())
}

/// 配置几个常用广告位
pub fn snapshot() -> ConfigSnapshot {
    let mut snapshot = ConfigSnapshot::default();
    for (placement, low) in [
        ("inter_common", "inter-low"),
        ("app_open_open_app", "open-low"),
        ("reward_daily_bonus", "reward-low"),
        ("native_onboard_screen", "native-low"),
        ("native_result", "native-result"),
        ("banner_home", "banner-unit"),
    ] {
        snapshot.unit_ids.insert(key(placement), unit(low));
    }
    snapshot
}

pub fn with_high_floor(mut snapshot: ConfigSnapshot, placement: &str, high: &str) -> ConfigSnapshot {
    snapshot.high_floor_unit_ids.insert(key(placement), unit(high));
    snapshot
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// 暂停时钟下的定时允许 ±5ms 的取整误差
pub fn assert_near(actual: Duration, expected: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= ms(5),
        "expected about {:?}, got {:?}",
        expected,
        actual
    );
}

/// 让 actor 处理完积压的消息并推进虚拟时钟
pub async fn settle(duration: Duration) {
    sleep(duration).await;
}
