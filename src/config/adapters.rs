// src/config/adapters.rs

use std::fs;
use std::path::PathBuf;

use crate::config::snapshot::ConfigSnapshot;
use crate::error::ConfigError;

/// 配置来源：只拉取、同步读取。编排器启动时调用一次，之后只在显式 reload 时调用。
pub trait ConfigProvider: Send + Sync {
    fn fetch(&self) -> Result<ConfigSnapshot, ConfigError>;
}

/// 从本地 JSON 文件读取配置
pub struct FileConfigProvider {
    pub path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigProvider for FileConfigProvider {
    fn fetch(&self) -> Result<ConfigSnapshot, ConfigError> {
        let content = fs::read_to_string(&self.path)?;
        let snapshot: ConfigSnapshot = serde_json::from_str(&content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// 内存中的固定配置（测试和沙盒使用）
pub struct StaticConfigProvider {
    snapshot: ConfigSnapshot,
}

impl StaticConfigProvider {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self { snapshot }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn fetch(&self) -> Result<ConfigSnapshot, ConfigError> {
        self.snapshot.validate()?;
        Ok(self.snapshot.clone())
    }
}
