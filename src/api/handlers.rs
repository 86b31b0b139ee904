// src/api/handlers.rs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ConfigManager;
use crate::logging::{LogLevel, RuntimeLogger};
use crate::model::creative::CreativeInfo;
use crate::model::placements::{AdFormat, PlacementKey};
use crate::orchestrator::{
    AdOrchestrators, AdState, CompositeAdManager, LoadAndShowOptions, ShowOutcome,
    WaterfallSlotInfo,
};

/// 沙盒 HTTP 接口共享的状态
pub struct AppState {
    pub orchestrators: AdOrchestrators,
    pub composite: CompositeAdManager,
    pub config: Arc<ConfigManager>,
    pub runtime_logger: Arc<RuntimeLogger>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiError {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: message.into() }))
}

#[derive(Deserialize, Debug)]
pub struct FormatQuery {
    pub format: Option<AdFormat>,
}

impl FormatQuery {
    fn required(&self) -> Result<AdFormat, (StatusCode, Json<ApiError>)> {
        self.format
            .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "missing `format` query parameter"))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PlacementStatus {
    pub placement: PlacementKey,
    pub format: Option<AdFormat>,
    /// 只有指定格式时才有
    pub state: Option<AdState>,
    pub loaded: bool,
    pub creative: Option<CreativeInfo>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShowMode {
    #[default]
    LoadAndShow,
    /// 正在加载时轮询等待
    Wait,
    IfAvailable,
}

#[derive(Deserialize, Debug)]
pub struct ShowRequest {
    pub format: AdFormat,
    #[serde(default)]
    pub mode: ShowMode,
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_prefer_high_floor")]
    pub prefer_high_floor: bool,
}

fn default_prefer_high_floor() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LifecycleResponse {
    pub action: String,
    pub formats: Vec<AdFormat>,
}

/// 查询广告位状态；不带 `format` 时对所有格式取“任意已加载 / 第一个素材”
pub async fn get_placement(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<PlacementStatus> {
    let placement = PlacementKey::from(key);
    let status = match query.format {
        Some(format) => {
            let manager = state.orchestrators.manager(format);
            let loaded = manager.is_ad_loaded(&placement);
            let creative = manager.loaded_ad(&placement);
            let ad_state = state.orchestrators.loadable(format).ad_state(&placement);
            let (loaded, creative, ad_state) = futures::join!(loaded, creative, ad_state);
            PlacementStatus {
                placement,
                format: Some(format),
                state: Some(ad_state),
                loaded,
                creative,
            }
        }
        None => {
            let (loaded, creative) = futures::join!(
                state.composite.is_ad_loaded(&placement),
                state.composite.loaded_ad(&placement)
            );
            PlacementStatus {
                placement,
                format: None,
                state: None,
                loaded,
                creative,
            }
        }
    };
    Ok(Json(status))
}

pub async fn preload_placement(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<FormatQuery>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let format = query.required()?;
    let placement = PlacementKey::from(key);
    info!(%format, placement = %placement, "preload requested over api");
    state.orchestrators.loadable(format).preload(&placement);
    Ok(StatusCode::ACCEPTED)
}

/// 渲染层取走素材；沙盒里取走即丢弃，只返回快照
pub async fn consume_placement(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<CreativeInfo> {
    let format = query.required()?;
    let placement = PlacementKey::from(key);
    let taken = state.orchestrators.loadable(format).consume(&placement);
    match taken.await {
        Some(creative) => Ok(Json(creative.info())),
        None => Err(api_error(StatusCode::NOT_FOUND, "no creative available")),
    }
}

/// 展示并等待结果（用户关闭、点击、跳过、失败或超时）
pub async fn show_placement(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(request): Json<ShowRequest>,
) -> ApiResult<ShowOutcome> {
    let placement = PlacementKey::from(key);
    let ticket = match state.orchestrators.showable(request.format) {
        Some(showable) => match request.mode {
            ShowMode::LoadAndShow => {
                let options = LoadAndShowOptions {
                    timeout: request.timeout_ms.map(Duration::from_millis),
                    prefer_high_floor: request.prefer_high_floor,
                };
                showable.load_and_show(&placement, options)
            }
            ShowMode::Wait => showable.show(&placement),
            ShowMode::IfAvailable => showable.show_if_available(&placement),
        },
        None => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("{} ads have no full-screen show", request.format),
            ))
        }
    };
    let outcome = ticket.await;
    info!(format = %request.format, placement = %placement, ?outcome, "show finished over api");
    Ok(Json(outcome))
}

pub async fn waterfall_slots(
    State(state): State<Arc<AppState>>,
    Path(format): Path<AdFormat>,
) -> ApiResult<Vec<WaterfallSlotInfo>> {
    let slots = match state.orchestrators.waterfall(format) {
        Some(waterfall) => waterfall.waterfall_slots(),
        None => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("{} ads have no waterfall", format),
            ))
        }
    };
    Ok(Json(slots.await))
}

pub async fn pause_all(State(state): State<Arc<AppState>>) -> Json<LifecycleResponse> {
    state.composite.pause();
    state.runtime_logger.info("ads paused (app backgrounded)").await;
    Json(LifecycleResponse {
        action: "pause".to_string(),
        formats: state.composite.formats(),
    })
}

pub async fn resume_all(State(state): State<Arc<AppState>>) -> Json<LifecycleResponse> {
    state.composite.resume();
    state.runtime_logger.info("ads resumed (app foregrounded)").await;
    Json(LifecycleResponse {
        action: "resume".to_string(),
        formats: state.composite.formats(),
    })
}

pub async fn destroy_all(State(state): State<Arc<AppState>>) -> Json<LifecycleResponse> {
    state.composite.destroy_all();
    state.runtime_logger.warn("all cached ads destroyed").await;
    Json(LifecycleResponse {
        action: "destroy".to_string(),
        formats: state.composite.formats(),
    })
}

/// 重新拉取配置并整体下发给所有编排器；拉取失败保留旧配置
pub async fn reload_config(State(state): State<Arc<AppState>>) -> ApiResult<LifecycleResponse> {
    match state.config.reload() {
        Ok(snapshot) => {
            state.composite.reload(snapshot);
            state.runtime_logger.info("ad config reloaded").await;
            Ok(Json(LifecycleResponse {
                action: "reload".to_string(),
                formats: state.composite.formats(),
            }))
        }
        Err(e) => {
            warn!(error = %e, "config reload over api failed");
            state
                .runtime_logger
                .log_with(
                    LogLevel::Error,
                    "ad config reload failed",
                    serde_json::json!({ "error": e.to_string() }),
                )
                .await;
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/placements/{key}", get(get_placement))
        .route("/placements/{key}/preload", post(preload_placement))
        .route("/placements/{key}/consume", post(consume_placement))
        .route("/placements/{key}/show", post(show_placement))
        .route("/waterfall/{format}", get(waterfall_slots))
        .route("/lifecycle/pause", post(pause_all))
        .route("/lifecycle/resume", post(resume_all))
        .route("/lifecycle/destroy", post(destroy_all))
        .route("/config/reload", post(reload_config))
        .with_state(state)
}
