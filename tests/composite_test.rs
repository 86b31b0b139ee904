mod common;

use std::sync::Arc;

use ad_orchestrator::model::AdFormat;
use ad_orchestrator::orchestrator::{
    AdOrchestrators, LoadAndShowOptions, Loadable, ShowOutcome, Showable, SkipReason,
    WaterfallCapable,
};
use common::*;

#[tokio::test(start_paused = true)]
async fn composite_aggregates_across_formats() {
    let network = ScriptedNetwork::filling(ms(100));
    let ads = AdOrchestrators::spawn(Arc::new(snapshot()), collaborators(&network));
    let composite = ads.composite();
    assert_eq!(composite.formats().len(), 5);

    assert!(!composite.is_ad_loaded(&key("inter_common")).await);
    ads.interstitial.preload(&key("inter_common"));
    ads.banner.preload(&key("banner_home"));
    settle(ms(200)).await;

    assert!(composite.is_ad_loaded(&key("inter_common")).await);
    assert!(!composite.is_ad_loaded(&key("unknown")).await);
    let banner = composite.loaded_ad(&key("banner_home")).await.unwrap();
    assert_eq!(banner.format, AdFormat::Banner);

    composite.destroy_all();
    assert!(!composite.is_ad_loaded(&key("inter_common")).await);
    assert!(!composite.is_ad_loaded(&key("banner_home")).await);
    assert_eq!(network.released(), 2);
}

#[tokio::test(start_paused = true)]
async fn composite_pause_and_resume_reach_every_format() {
    let network = ScriptedNetwork::failing(ms(10));
    let ads = AdOrchestrators::spawn(Arc::new(snapshot()), collaborators(&network));
    let composite = ads.composite();

    ads.banner.preload(&key("banner_home"));
    composite.pause();
    settle(ms(5000)).await;
    // 暂停后 banner 的退避重试不再发生
    assert_eq!(network.request_count(), 1);

    composite.resume();
    settle(ms(5)).await;
    assert_eq!(network.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn reload_swaps_snapshot_in_place() {
    let network = ScriptedNetwork::filling(ms(100));
    let ads = AdOrchestrators::spawn(Arc::new(snapshot()), collaborators(&network));
    let composite = ads.composite();
    assert!(ads.interstitial.waterfall_slots().await.is_empty());

    let mut disabled = snapshot();
    disabled.ads_disabled = true;
    disabled.waterfall.enabled = true;
    composite.reload(Arc::new(disabled));

    assert_eq!(
        ads.interstitial
            .load_and_show(&key("inter_common"), LoadAndShowOptions::default())
            .await,
        ShowOutcome::skipped(SkipReason::AdsDisabled)
    );
    let names: Vec<String> = ads
        .interstitial
        .waterfall_slots()
        .await
        .into_iter()
        .map(|slot| slot.name)
        .collect();
    assert_eq!(names, vec!["I-Base-Low", "I-Base-High"]);
    assert_eq!(network.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn waterfall_load_and_show_presents_first_ready_slot() {
    let network = ScriptedNetwork::filling(ms(100));
    let mut config = snapshot();
    config.waterfall.enabled = true;
    config.waterfall.ramp_up_ms = 500;
    config
        .floor_low
        .insert(AdFormat::Interstitial, unit("inter-base-low"));
    config
        .floor_high
        .insert(AdFormat::Interstitial, unit("inter-base-high"));
    let ads = AdOrchestrators::spawn(Arc::new(config), collaborators(&network));

    let outcome = ads
        .interstitial
        .load_and_show(&key("inter_common"), LoadAndShowOptions::default())
        .await;
    assert!(outcome.was_shown());
    assert_eq!(network.presented(), vec!["inter-base-low"]);

    // 被取走的 slot 立即补货，高 floor slot 按 ramp_up 间隔启动
    settle(ms(1000)).await;
    let requests = network.requests();
    assert_eq!(requests[0].unit_id, unit("inter-base-low"));
    let high = requests
        .iter()
        .find(|r| r.unit_id == unit("inter-base-high"))
        .unwrap();
    assert_near(high.at - requests[0].at, ms(500));
    assert_eq!(network.requests_for("inter-base-low"), 2);
    assert_eq!(network.requests_for("inter-base-high"), 1);
}
