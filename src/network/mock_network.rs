use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::post, serve, Json, Router};
use rand::Rng;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::model::creative::{BannerSize, CreativePayload, NativeAssets, Reward};
use crate::model::placements::AdFormat;
use crate::network::{AdRequest, AdResponse, ImpressionBeacon};

/// 沙盒广告服务参数
#[derive(Debug, Clone, Copy)]
pub struct MockNetworkSettings {
    /// 填充率 0.0 ~ 1.0
    pub fill_rate: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl Default for MockNetworkSettings {
    fn default() -> Self {
        Self {
            fill_rate: 0.8,
            min_latency_ms: 100,
            max_latency_ms: 300,
        }
    }
}

fn mock_payload(format: AdFormat) -> CreativePayload {
    match format {
        AdFormat::Native => CreativePayload::Native(NativeAssets {
            headline: "Mock Native Ad".to_string(),
            body: Some("Sandbox creative served by the mock network".to_string()),
            call_to_action: Some("Install".to_string()),
            icon_url: Some("http://example.com/icon.png".to_string()),
            image_url: Some("http://example.com/native.jpg".to_string()),
        }),
        AdFormat::Banner => CreativePayload::Banner(BannerSize {
            width: 320,
            height: 50,
        }),
        AdFormat::Interstitial => CreativePayload::Interstitial,
        AdFormat::AppOpen => CreativePayload::AppOpen,
        AdFormat::Rewarded => CreativePayload::Rewarded(Reward {
            kind: "coins".to_string(),
            amount: 10,
        }),
    }
}

/// 模拟上游：随机延迟后按填充率决定返回素材还是 204
async fn handle_ad_request(
    State(settings): State<Arc<MockNetworkSettings>>,
    Json(request): Json<AdRequest>,
) -> Response {
    info!(
        "Mock network received ad request: id={}, format={}, unit_id={}",
        request.request_id, request.format, request.unit_id
    );

    let (filled, delay_ms) = {
        let mut rng = rand::thread_rng();
        let delay_ms = if settings.max_latency_ms > settings.min_latency_ms {
            rng.gen_range(settings.min_latency_ms..settings.max_latency_ms)
        } else {
            settings.min_latency_ms
        };
        (rng.gen_bool(settings.fill_rate.clamp(0.0, 1.0)), delay_ms)
    };
    sleep(Duration::from_millis(delay_ms)).await;

    if !filled || request.unit_id.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    Json(AdResponse {
        request_id: request.request_id,
        filled: true,
        payload: Some(mock_payload(request.format)),
    })
    .into_response()
}

async fn handle_impression(Json(beacon): Json<ImpressionBeacon>) -> StatusCode {
    info!(
        "Mock network impression: creative={}, format={}, unit_id={}",
        beacon.creative_id, beacon.format, beacon.unit_id
    );
    StatusCode::OK
}

pub fn mock_router(settings: MockNetworkSettings) -> Router {
    Router::new()
        .route("/ad", post(handle_ad_request))
        .route("/impression", post(handle_impression))
        .with_state(Arc::new(settings))
}

/// 在已绑定的 listener 上提供服务（测试用端口 0）
pub async fn serve_mock_network(
    listener: TcpListener,
    settings: MockNetworkSettings,
) -> std::io::Result<()> {
    serve(listener, mock_router(settings)).await
}

/// 启动沙盒广告服务，路由为 `/ad` 和 `/impression`
pub async fn start_mock_network(port: u16, settings: MockNetworkSettings) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Mock ad network running at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    serve_mock_network(listener, settings).await
}
