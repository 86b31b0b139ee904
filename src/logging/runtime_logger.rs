// src/logging/runtime_logger.rs

use chrono::{FixedOffset, Offset, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::MakeWriter;

/// 运行日志统一使用东八区时间
static LOG_TIMEZONE: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix()));

const RETENTION_HOURS: u64 = 72;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// 批量写盘参数
#[derive(Debug, Clone, Copy)]
pub struct RuntimeLogSettings {
    /// mpsc 通道缓冲区大小
    pub buffer_size: usize,
    /// 每个级别攒够多少条写一次
    pub batch_size: usize,
    /// 定时刷新间隔
    pub flush_interval: Duration,
}

impl Default for RuntimeLogSettings {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            batch_size: 100,
            flush_interval: Duration::from_millis(1000),
        }
    }
}

enum LogCommand {
    Entry { level: LogLevel, line: String },
    Flush(oneshot::Sender<()>),
}

/// **运行日志管理器**
///
/// 记录沙盒服务自身的运行状态（启动、配置加载、生命周期切换、退出），
/// 按级别分流到 `{prefix}_{level}.json` 并按小时滚动，超过 72 小时的文件定期清理。
/// 编排器内部的事件走 `tracing`，不经过这里。
pub struct RuntimeLogger {
    sender: Sender<LogCommand>,
}

impl RuntimeLogger {
    pub fn new(log_dir: impl AsRef<Path>, file_prefix: &str, settings: RuntimeLogSettings) -> Arc<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        let (sender, receiver) = mpsc::channel(settings.buffer_size.max(1));
        let log_files: HashMap<LogLevel, Arc<RollingFileAppender>> = LogLevel::ALL
            .iter()
            .map(|level| {
                let file_name = format!("{}_{}.json", file_prefix, level.as_str().to_lowercase());
                (*level, Arc::new(rolling::hourly(&log_dir, file_name)))
            })
            .collect();

        tokio::spawn(Self::background_log_writer(log_files, receiver, settings));
        {
            let prefix = file_prefix.to_string();
            tokio::spawn(async move {
                loop {
                    Self::cleanup_old_logs(&log_dir, &prefix, RETENTION_HOURS).await;
                    time::sleep(CLEANUP_INTERVAL).await;
                }
            });
        }
        Arc::new(Self { sender })
    }

    pub async fn log(&self, level: LogLevel, message: &str) {
        self.log_with(level, message, Value::Null).await;
    }

    /// 附带结构化字段，`fields` 为 JSON 对象时展开到顶层
    pub async fn log_with(&self, level: LogLevel, message: &str, fields: Value) {
        let line = Self::render(level, message, fields);
        if let Err(e) = self.sender.send(LogCommand::Entry { level, line }).await {
            eprintln!("Failed to send runtime log message: {}", e);
        }
    }

    pub async fn info(&self, message: &str) {
        self.log(LogLevel::Info, message).await;
    }

    pub async fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message).await;
    }

    pub async fn error(&self, message: &str) {
        self.log(LogLevel::Error, message).await;
    }

    fn render(level: LogLevel, message: &str, fields: Value) -> String {
        let timestamp = Utc::now().with_timezone(&*LOG_TIMEZONE).to_rfc3339();
        let mut entry = json!({
            "timestamp": timestamp,
            "level": level.as_str(),
            "message": message,
        });
        if let (Value::Object(extra), Value::Object(map)) = (fields, &mut entry) {
            for (key, value) in extra {
                map.entry(key).or_insert(value);
            }
        }
        entry.to_string()
    }

    async fn background_log_writer(
        log_files: HashMap<LogLevel, Arc<RollingFileAppender>>,
        mut receiver: Receiver<LogCommand>,
        settings: RuntimeLogSettings,
    ) {
        let mut buffers: HashMap<LogLevel, Vec<String>> =
            log_files.keys().map(|level| (*level, Vec::new())).collect();
        let mut interval = time::interval(settings.flush_interval);
        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(LogCommand::Entry { level, line }) => {
                        let buffer = buffers.entry(level).or_default();
                        buffer.push(line);
                        if buffer.len() >= settings.batch_size {
                            let lines = std::mem::take(buffer);
                            if let Some(appender) = log_files.get(&level) {
                                Self::write_logs_to_disk(appender.clone(), lines).await;
                            }
                        }
                    }
                    Some(LogCommand::Flush(done)) => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        let _ = done.send(());
                    }
                    None => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush_all(&log_files, &mut buffers).await;
                }
            }
        }
    }

    async fn flush_all(
        log_files: &HashMap<LogLevel, Arc<RollingFileAppender>>,
        buffers: &mut HashMap<LogLevel, Vec<String>>,
    ) {
        for (level, buffer) in buffers.iter_mut() {
            if buffer.is_empty() {
                continue;
            }
            let lines = std::mem::take(buffer);
            if let Some(appender) = log_files.get(level) {
                Self::write_logs_to_disk(appender.clone(), lines).await;
            }
        }
    }

    async fn write_logs_to_disk(file: Arc<RollingFileAppender>, lines: Vec<String>) {
        let content = lines.join("\n") + "\n";
        let result = task::spawn_blocking(move || {
            let mut writer = file.make_writer();
            let written = writer.write_all(content.as_bytes());
            written
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Failed to write runtime logs: {}", e),
            Err(e) => eprintln!("Runtime log writer task failed: {}", e),
        }
    }

    /// 只清理本 logger 自己的文件
    async fn cleanup_old_logs(log_dir: &PathBuf, prefix: &str, retention_hours: u64) {
        let retention = std::time::Duration::from_secs(retention_hours * 3600);
        let now = std::time::SystemTime::now();
        let mut dir = match tokio::fs::read_dir(log_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Failed to read log directory {:?}: {}", log_dir, e);
                return;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            if !entry.file_name().to_string_lossy().starts_with(prefix) {
                continue;
            }
            let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
                continue;
            };
            if now.duration_since(modified).unwrap_or_default() > retention {
                let path = entry.path();
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    eprintln!("Failed to delete old log file {:?}: {}", path, e);
                }
            }
        }
    }

    /// 把缓冲区里剩下的日志全部写盘
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(LogCommand::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }
}
