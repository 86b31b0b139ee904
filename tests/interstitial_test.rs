mod common;

use std::sync::Arc;
use tokio::time::Instant;

use ad_orchestrator::config::ClickGuardConfig;
use ad_orchestrator::guard::SessionClickGuard;
use ad_orchestrator::network::PresentEvent;
use ad_orchestrator::orchestrator::{
    AdManager, AdState, InterstitialAds, LoadAndShowOptions, Loadable, ShowOutcome, Showable,
    SkipReason,
};
use common::*;

fn dismissed() -> ShowOutcome {
    ShowOutcome::Dismissed {
        clicked: false,
        reward: None,
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_preloads_issue_one_request() {
    let network = ScriptedNetwork::filling(ms(500));
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));
    let placement = key("inter_common");

    ads.preload(&placement);
    ads.preload(&placement);
    assert_eq!(ads.ad_state(&placement).await, AdState::Waiting);

    settle(ms(600)).await;
    assert_eq!(network.requests_for("inter-low"), 1);
    assert!(ads.is_ad_loaded(&placement).await);
    assert_eq!(ads.ad_state(&placement).await, AdState::Loaded);
}

#[tokio::test(start_paused = true)]
async fn placements_sharing_a_unit_share_one_request() {
    let network = ScriptedNetwork::filling(ms(200));
    let mut config = snapshot();
    config
        .unit_ids
        .insert(key("inter_result"), unit("inter-low"));
    let ads = InterstitialAds::spawn(Arc::new(config), collaborators(&network));

    ads.preload(&key("inter_common"));
    ads.preload(&key("inter_result"));
    settle(ms(300)).await;

    assert_eq!(network.request_count(), 1);
    assert!(ads.is_ad_loaded(&key("inter_common")).await);
    assert!(ads.is_ad_loaded(&key("inter_result")).await);
}

#[tokio::test(start_paused = true)]
async fn high_floor_failure_escalates_exactly_once() {
    let network = ScriptedNetwork::failing(ms(100));
    let config = with_high_floor(snapshot(), "inter_common", "inter-high");
    let ads = InterstitialAds::spawn(Arc::new(config), collaborators(&network));
    let placement = key("inter_common");

    ads.preload(&placement);
    settle(ms(10_000)).await;

    assert_eq!(network.requested_units(), vec!["inter-high", "inter-low"]);
    let requests = network.requests();
    // 失败 100ms + 降级等待 1000ms
    assert_near(requests[1].at - requests[0].at, ms(1100));
    assert!(!ads.is_ad_loaded(&placement).await);
    assert_eq!(ads.ad_state(&placement).await, AdState::NotLoaded);

    // 外部再次预加载才会重新从高 floor 开始
    ads.preload(&placement);
    settle(ms(50)).await;
    assert_eq!(network.requested_units().last().map(String::as_str), Some("inter-high"));
}

#[tokio::test(start_paused = true)]
async fn load_and_show_presents_then_refills() {
    let network = ScriptedNetwork::filling(ms(100));
    let indicator = Arc::new(RecordingIndicator::default());
    let ads = InterstitialAds::spawn(
        Arc::new(snapshot()),
        collaborators(&network).with_indicator(indicator.clone()),
    );
    let placement = key("inter_common");

    let outcome = ads
        .load_and_show(&placement, LoadAndShowOptions::default())
        .await;
    assert_eq!(outcome, dismissed());
    assert_eq!(network.presented(), vec!["inter-low"]);
    assert_eq!(indicator.shown(), 1);
    assert_eq!(indicator.dismissed(), 1);

    settle(ms(200)).await;
    assert_eq!(network.request_count(), 2);
    assert!(ads.is_ad_loaded(&placement).await);
}

#[tokio::test(start_paused = true)]
async fn cooldown_skips_without_requests() {
    let network = ScriptedNetwork::filling(ms(100));
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));
    let placement = key("inter_common");

    let first = ads
        .load_and_show(&placement, LoadAndShowOptions::default())
        .await;
    assert_eq!(first, dismissed());
    let before = network.request_count();

    let second = ads
        .load_and_show(&placement, LoadAndShowOptions::default())
        .await;
    assert_eq!(second, ShowOutcome::skipped(SkipReason::Cooldown));
    assert_eq!(network.request_count(), before);

    // 冷却默认 60 秒
    settle(ms(61_000)).await;
    let third = ads
        .load_and_show(&placement, LoadAndShowOptions::default())
        .await;
    assert_eq!(third, dismissed());
    assert_eq!(network.presented().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cooldown_does_not_gate_other_placements() {
    let network = ScriptedNetwork::filling(ms(100));
    let mut config = snapshot();
    config
        .unit_ids
        .insert(key("inter_result"), unit("inter-result"));
    let ads = InterstitialAds::spawn(Arc::new(config), collaborators(&network));

    let first = ads
        .load_and_show(&key("inter_common"), LoadAndShowOptions::default())
        .await;
    assert!(first.was_shown());
    let other = ads
        .load_and_show(&key("inter_result"), LoadAndShowOptions::default())
        .await;
    assert!(other.was_shown());
}

#[tokio::test(start_paused = true)]
async fn ads_disabled_skips_immediately() {
    let network = ScriptedNetwork::filling(ms(100));
    let mut config = snapshot();
    config.ads_disabled = true;
    let ads = InterstitialAds::spawn(Arc::new(config), collaborators(&network));

    let outcome = ads
        .load_and_show(&key("inter_common"), LoadAndShowOptions::default())
        .await;
    assert_eq!(outcome, ShowOutcome::skipped(SkipReason::AdsDisabled));
    assert_eq!(network.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn ads_disabled_blocks_background_loading() {
    let network = ScriptedNetwork::filling(ms(100));
    let mut config = snapshot();
    config.ads_disabled = true;
    let ads = InterstitialAds::spawn(Arc::new(config), collaborators(&network));
    let placement = key("inter_common");

    ads.preload(&placement);
    ads.init();
    settle(ms(500)).await;
    assert_eq!(network.request_count(), 0);
    assert!(!ads.is_ad_loaded(&placement).await);
}

#[tokio::test(start_paused = true)]
async fn second_request_while_waiting_is_skipped() {
    let network = ScriptedNetwork::filling(ms(500));
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));
    let placement = key("inter_common");

    let pending = ads.load_and_show(&placement, LoadAndShowOptions::default());
    let second = ads
        .load_and_show(&placement, LoadAndShowOptions::default())
        .await;
    assert_eq!(second, ShowOutcome::skipped(SkipReason::AlreadyShowing));
    assert_eq!(pending.await, dismissed());
}

#[tokio::test(start_paused = true)]
async fn load_and_show_reports_terminal_failure() {
    let network = ScriptedNetwork::failing(ms(100));
    let indicator = Arc::new(RecordingIndicator::default());
    let config = with_high_floor(snapshot(), "inter_common", "inter-high");
    let ads = InterstitialAds::spawn(
        Arc::new(config),
        collaborators(&network).with_indicator(indicator.clone()),
    );

    let start = Instant::now();
    let outcome = ads
        .load_and_show(&key("inter_common"), LoadAndShowOptions::default())
        .await;
    assert_eq!(outcome, ShowOutcome::LoadFailed);
    // 高 floor 失败 100ms，固定等 1000ms，低 floor 再失败 100ms
    assert_near(start.elapsed(), ms(1200));
    assert_eq!(network.requested_units(), vec!["inter-high", "inter-low"]);
    assert_eq!(indicator.shown(), indicator.dismissed());
}

#[tokio::test(start_paused = true)]
async fn click_finishes_interstitial_and_notifies_guard() {
    let network = ScriptedNetwork::filling(ms(100));
    network.set_present_events(vec![
        PresentEvent::Shown,
        PresentEvent::Clicked,
        PresentEvent::Dismissed,
    ]);
    let guard = Arc::new(CountingGuard::default());
    let ads = InterstitialAds::spawn(
        Arc::new(snapshot()),
        collaborators(&network).with_guard(guard.clone()),
    );

    let outcome = ads
        .load_and_show(&key("inter_common"), LoadAndShowOptions::default())
        .await;
    assert_eq!(outcome, ShowOutcome::Clicked);
    assert_eq!(guard.clicks(), 1);
}

#[tokio::test(start_paused = true)]
async fn click_limit_suppresses_further_shows() {
    let network = ScriptedNetwork::filling(ms(100));
    network.set_present_events(vec![
        PresentEvent::Shown,
        PresentEvent::Clicked,
        PresentEvent::Dismissed,
    ]);
    let guard = Arc::new(SessionClickGuard::new(ClickGuardConfig {
        time_per_session: 300,
        max_ad_click_per_session: 1,
        time_disable_ads_when_reached_max_ad_click: 1800,
    }));
    let ads = InterstitialAds::spawn(
        Arc::new(snapshot()),
        collaborators(&network).with_guard(guard),
    );
    let placement = key("inter_common");

    assert_eq!(
        ads.load_and_show(&placement, LoadAndShowOptions::default()).await,
        ShowOutcome::Clicked
    );
    assert_eq!(
        ads.show(&placement).await,
        ShowOutcome::skipped(SkipReason::ClickSuppressed)
    );

    // 限制期间关闭后的补货也不发请求
    settle(ms(1000)).await;
    assert_eq!(network.request_count(), 1);
    assert!(!ads.is_ad_loaded(&placement).await);
}

#[tokio::test(start_paused = true)]
async fn show_failure_refills_without_cooldown() {
    let network = ScriptedNetwork::filling(ms(100));
    network.set_present_events(vec![PresentEvent::FailedToShow("surface gone".to_string())]);
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));
    let placement = key("inter_common");

    let outcome = ads
        .load_and_show(&placement, LoadAndShowOptions::default())
        .await;
    assert_eq!(
        outcome,
        ShowOutcome::ShowFailed {
            reason: "surface gone".to_string()
        }
    );

    network.set_present_events(vec![PresentEvent::Shown, PresentEvent::Dismissed]);
    settle(ms(200)).await;
    // 没有进入冷却
    let retry = ads
        .load_and_show(&placement, LoadAndShowOptions::default())
        .await;
    assert_eq!(retry, dismissed());
}

#[tokio::test(start_paused = true)]
async fn polling_show_waits_for_in_flight_load() {
    let network = ScriptedNetwork::filling(ms(2500));
    let indicator = Arc::new(RecordingIndicator::default());
    let ads = InterstitialAds::spawn(
        Arc::new(snapshot()),
        collaborators(&network).with_indicator(indicator.clone()),
    );
    let placement = key("inter_common");

    ads.preload(&placement);
    let start = Instant::now();
    let outcome = ads.show(&placement).await;
    assert_eq!(outcome, dismissed());
    // 第 3 个 tick 发现素材，再加 100ms 展示
    assert_near(start.elapsed(), ms(3100));
    assert_eq!(indicator.shown(), 1);
    assert_eq!(indicator.dismissed(), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_show_times_out() {
    let network = ScriptedNetwork::filling(ms(10_000));
    let indicator = Arc::new(RecordingIndicator::default());
    let ads = InterstitialAds::spawn(
        Arc::new(snapshot()),
        collaborators(&network).with_indicator(indicator.clone()),
    );
    let placement = key("inter_common");

    ads.preload(&placement);
    let start = Instant::now();
    assert_eq!(ads.show(&placement).await, ShowOutcome::TimedOut);
    assert_near(start.elapsed(), ms(5000));
    assert_eq!(indicator.dismissed(), 1);
}

#[tokio::test(start_paused = true)]
async fn show_without_pending_load_is_unavailable_and_preloads() {
    let network = ScriptedNetwork::filling(ms(100));
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));
    let placement = key("inter_common");

    assert_eq!(ads.show(&placement).await, ShowOutcome::Unavailable);
    settle(ms(200)).await;
    assert_eq!(network.request_count(), 1);
    assert!(ads.is_ad_loaded(&placement).await);
}

#[tokio::test(start_paused = true)]
async fn expired_creative_reloads_itself() {
    let network = ScriptedNetwork::filling(ms(10));
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));
    let placement = key("inter_common");

    ads.preload(&placement);
    settle(ms(50)).await;
    assert_eq!(network.request_count(), 1);

    settle(ms(3_600_000)).await;
    assert_eq!(network.request_count(), 2);
    assert_eq!(network.released(), 1);
    assert!(ads.is_ad_loaded(&placement).await);
}

#[tokio::test(start_paused = true)]
async fn destroy_all_aborts_waiting_sessions() {
    let network = ScriptedNetwork::filling(ms(5000));
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));

    let pending = ads.load_and_show(&key("inter_common"), LoadAndShowOptions::default());
    settle(ms(100)).await;
    ads.destroy_all();
    assert_eq!(pending.await, ShowOutcome::Aborted);

    // 销毁后迟到的素材不会进入缓存
    settle(ms(6000)).await;
    assert!(!ads.is_ad_loaded(&key("inter_common")).await);
    assert_eq!(network.released(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_orchestrator_answers_aborted() {
    let network = ScriptedNetwork::filling(ms(100));
    let ads = InterstitialAds::spawn(Arc::new(snapshot()), collaborators(&network));
    ads.shutdown();
    settle(ms(10)).await;

    assert!(!ads.is_ad_loaded(&key("inter_common")).await);
    assert_eq!(
        ads.load_and_show(&key("inter_common"), LoadAndShowOptions::default())
            .await,
        ShowOutcome::Aborted
    );
}
