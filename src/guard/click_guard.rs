// src/guard/click_guard.rs

use std::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::ClickGuardConfig;

/// 防误点/刷点击协作者。编排器只负责通知点击和查询是否暂停广告，不关心内部计数。
pub trait ClickGuard: Send + Sync + 'static {
    fn notify_click(&self);

    fn ads_suppressed(&self) -> bool;
}

/// 不做任何限制
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClickGuard;

impl ClickGuard for NoopClickGuard {
    fn notify_click(&self) {}

    fn ads_suppressed(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct SessionState {
    session_start: Instant,
    clicks: u32,
    suppressed_since: Option<Instant>,
}

/// **按会话计数的点击限制**
///
/// 一个会话窗口（`time_per_session` 秒）内点击次数达到 `max_ad_click_per_session`
/// 后，在 `time_disable_ads_when_reached_max_ad_click` 秒内暂停所有广告。
/// 超出窗口的点击开启新会话并从 1 开始计数。
#[derive(Debug)]
pub struct SessionClickGuard {
    config: ClickGuardConfig,
    state: Mutex<SessionState>,
}

impl SessionClickGuard {
    pub fn new(config: ClickGuardConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SessionState {
                session_start: Instant::now(),
                clicks: 0,
                suppressed_since: None,
            }),
        }
    }

    fn session_window(&self) -> Duration {
        Duration::from_secs(self.config.time_per_session)
    }

    fn disable_window(&self) -> Duration {
        Duration::from_secs(self.config.time_disable_ads_when_reached_max_ad_click)
    }
}

impl Default for SessionClickGuard {
    fn default() -> Self {
        Self::new(ClickGuardConfig::default())
    }
}

impl ClickGuard for SessionClickGuard {
    fn notify_click(&self) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if now.duration_since(state.session_start) < self.session_window() {
            state.clicks += 1;
            if state.clicks >= self.config.max_ad_click_per_session {
                state.clicks = 0;
                state.suppressed_since = Some(now);
                warn!(
                    disable_secs = self.config.time_disable_ads_when_reached_max_ad_click,
                    "ad click limit reached, suppressing ads"
                );
            }
        } else {
            state.clicks = 1;
            state.session_start = now;
        }
    }

    fn ads_suppressed(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.suppressed_since {
            Some(since) if since.elapsed() < self.disable_window() => true,
            Some(_) => {
                state.suppressed_since = None;
                info!("ad click suppression lifted");
                false
            }
            None => false,
        }
    }
}
