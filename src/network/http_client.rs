// src/network/http_client.rs

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LoadError;
use crate::model::creative::{Creative, CreativePayload};
use crate::model::placements::{AdFormat, UnitId};
use crate::network::{AdNetwork, AdRequest, AdResponse, ImpressionBeacon, PresentEvent};

/// 通过 HTTP JSON 接口请求广告的客户端（沙盒里对接 mock_network）
pub struct HttpAdNetwork {
    client: Client,
    base_url: String,
    request_timeout: Duration,
    display_time: Duration,
}

impl HttpAdNetwork {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(2000),
            display_time: Duration::from_millis(1500),
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// 模拟用户看广告的时长，结束后发出 `Dismissed`
    pub fn with_display_time(mut self, display_time: Duration) -> Self {
        self.display_time = display_time;
        self
    }
}

async fn fetch_creative(
    client: Client,
    url: String,
    request: AdRequest,
    limit: Duration,
) -> Result<Creative, LoadError> {
    let start = Instant::now();
    let response = timeout(limit, client.post(&url).json(&request).send())
        .await
        .map_err(|_| LoadError::Timeout(limit.as_millis() as u64))??;
    let elapsed = start.elapsed().as_millis();

    if response.status() == StatusCode::NO_CONTENT {
        debug!(unit_id = %request.unit_id, elapsed_ms = elapsed as u64, "upstream returned no content");
        return Err(LoadError::NoFill);
    }
    if !response.status().is_success() {
        return Err(LoadError::Network(format!("status {}", response.status())));
    }

    let body: AdResponse = response.json().await?;
    match body.payload {
        Some(payload) if body.filled => {
            if payload.format() != request.format {
                return Err(LoadError::InvalidResponse(format!(
                    "expected {} creative, got {}",
                    request.format,
                    payload.format()
                )));
            }
            debug!(unit_id = %request.unit_id, elapsed_ms = elapsed as u64, "upstream filled");
            Ok(Creative::new(request.unit_id, payload))
        }
        _ => Err(LoadError::NoFill),
    }
}

impl AdNetwork for HttpAdNetwork {
    fn request(
        &self,
        format: AdFormat,
        unit_id: &UnitId,
    ) -> BoxFuture<'static, Result<Creative, LoadError>> {
        let request = AdRequest {
            request_id: Uuid::new_v4().to_string(),
            format,
            unit_id: unit_id.clone(),
        };
        let url = format!("{}/ad", self.base_url);
        fetch_creative(self.client.clone(), url, request, self.request_timeout).boxed()
    }

    fn present(&self, creative: Creative) -> BoxStream<'static, PresentEvent> {
        let client = self.client.clone();
        let url = format!("{}/impression", self.base_url);
        let display_time = self.display_time;
        let beacon = ImpressionBeacon {
            creative_id: creative.id().to_string(),
            unit_id: creative.unit_id().clone(),
            format: creative.format(),
        };
        let reward = match creative.payload() {
            CreativePayload::Rewarded(reward) => Some(reward.clone()),
            _ => None,
        };

        let shown = stream::once(async move {
            match client.post(&url).json(&beacon).send().await {
                Ok(resp) if resp.status().is_success() => PresentEvent::Shown,
                Ok(resp) => PresentEvent::FailedToShow(format!("impression status {}", resp.status())),
                Err(e) => {
                    warn!(error = %e, "impression beacon failed");
                    PresentEvent::FailedToShow(e.to_string())
                }
            }
        });

        shown
            .flat_map(move |event| {
                let tail: BoxStream<'static, PresentEvent> = match event {
                    PresentEvent::Shown => {
                        let reward = reward.clone();
                        stream::once(sleep(display_time))
                            .flat_map(move |_| {
                                let mut rest = Vec::with_capacity(2);
                                if let Some(reward) = reward.clone() {
                                    rest.push(PresentEvent::RewardEarned(reward));
                                }
                                rest.push(PresentEvent::Dismissed);
                                stream::iter(rest)
                            })
                            .boxed()
                    }
                    _ => stream::empty().boxed(),
                };
                stream::once(async move { event }).chain(tail)
            })
            .boxed()
    }

    fn release(&self, creative: Creative) {
        debug!(creative_id = %creative.id(), unit_id = %creative.unit_id(), "creative released");
    }
}
