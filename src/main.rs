// src/main.rs

use axum::serve;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use ad_orchestrator::api::{self, AppState};
use ad_orchestrator::config::{
    ConfigManager, ConfigProvider, ConfigSnapshot, FileConfigProvider, StaticConfigProvider,
};
use ad_orchestrator::guard::SessionClickGuard;
use ad_orchestrator::logging::{LogLevel, RuntimeLogSettings, RuntimeLogger};
use ad_orchestrator::network::{start_mock_network, HttpAdNetwork, MockNetworkSettings};
use ad_orchestrator::orchestrator::{AdOrchestrators, Collaborators};

#[derive(Parser, Debug)]
#[command(
    author = "whiteCcinn",
    version = "1.0",
    about = "Sandbox harness for the mobile ad inventory orchestrator"
)]
struct CliArgs {
    /// 状态接口端口
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    /// 广告配置 JSON；不传则使用沙盒测试广告位
    #[arg(short, long)]
    config: Option<String>,
    #[arg(long, default_value_t = 9001)]
    mock_port: u16,
    /// mock 广告网络的填充率
    #[arg(long, default_value_t = 0.8)]
    fill_rate: f64,
}

fn sandbox_snapshot() -> ConfigSnapshot {
    ConfigSnapshot {
        sandbox: true,
        ..ConfigSnapshot::default()
    }
}

#[tokio::main]
async fn main() {
    // 设置环境变量 TZ 为东八区
    std::env::set_var("TZ", "Asia/Shanghai");

    let args = CliArgs::parse();

    // 初始化全局 tracing 日志，编排器的每次状态变化都写在这里
    let log_file = rolling::hourly(&args.log_dir, "orchestrator_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(non_blocking));
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global tracing subscriber: {}", e);
        return;
    }
    info!("ad sandbox starting on port {}", args.port);

    // 运行日志：服务启动、配置、生命周期切换
    let runtime_logger = RuntimeLogger::new(&args.log_dir, "runtime", RuntimeLogSettings::default());
    runtime_logger.info("ad sandbox is starting...").await;

    // 启动 mock 广告网络
    let mock_settings = MockNetworkSettings {
        fill_rate: args.fill_rate,
        ..MockNetworkSettings::default()
    };
    let mock_port = args.mock_port;
    let mock_network = tokio::spawn(async move {
        if let Err(e) = start_mock_network(mock_port, mock_settings).await {
            error!(error = %e, "mock ad network stopped");
        }
    });

    // 读取广告配置
    let provider: Box<dyn ConfigProvider> = match &args.config {
        Some(path) => Box::new(FileConfigProvider::new(path)),
        None => Box::new(StaticConfigProvider::new(sandbox_snapshot())),
    };
    let config = Arc::new(ConfigManager::new(provider));
    let snapshot = match config.reload() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            runtime_logger
                .log_with(
                    LogLevel::Error,
                    "ad config load failed, using defaults",
                    json!({ "error": e.to_string(), "path": args.config.clone() }),
                )
                .await;
            config.snapshot()
        }
    };

    let network = HttpAdNetwork::new(format!("http://127.0.0.1:{}", args.mock_port));
    let guard = SessionClickGuard::new(snapshot.click_guard);
    let collaborators = Collaborators::new(Arc::new(network)).with_guard(Arc::new(guard));
    let orchestrators = AdOrchestrators::spawn(snapshot, collaborators);
    let composite = orchestrators.composite();
    composite.init();
    runtime_logger
        .log_with(
            LogLevel::Info,
            "ad orchestrators initialized",
            json!({ "formats": composite.formats() }),
        )
        .await;

    let state = Arc::new(AppState {
        orchestrators: orchestrators.clone(),
        composite: composite.clone(),
        config: config.clone(),
        runtime_logger: runtime_logger.clone(),
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            runtime_logger
                .error(&format!("failed to bind {}: {}", addr, e))
                .await;
            runtime_logger.shutdown().await;
            return;
        }
    };
    runtime_logger
        .info(&format!("ad sandbox running at http://{}", addr))
        .await;
    let sandbox_server = tokio::spawn(async move {
        if let Err(e) = serve(listener, api::router(state)).await {
            error!(error = %e, "sandbox api server stopped");
        }
    });

    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
    runtime_logger.info("Shutting down gracefully...").await;

    composite.destroy_all();
    orchestrators.shutdown();
    sandbox_server.abort();
    mock_network.abort();
    if let (Err(e), _) | (_, Err(e)) = tokio::join!(sandbox_server, mock_network) {
        if !e.is_cancelled() {
            warn!(error = %e, "background task ended abnormally");
        }
    }
    runtime_logger.info("ad sandbox shut down.").await;
    runtime_logger.shutdown().await;
}
