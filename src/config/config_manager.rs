use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::config::adapters::ConfigProvider;
use crate::config::snapshot::ConfigSnapshot;
use crate::error::ConfigError;

/// 持有配置来源和当前快照。快照以 `Arc` 整体替换，编排器各自保存一份引用。
pub struct ConfigManager {
    provider: Box<dyn ConfigProvider>,
    current: RwLock<Arc<ConfigSnapshot>>,
}

impl ConfigManager {
    pub fn new(provider: Box<dyn ConfigProvider>) -> Self {
        ConfigManager {
            provider,
            current: RwLock::new(Arc::new(ConfigSnapshot::default())),
        }
    }

    /// 从来源拉取一次；失败时保留旧快照并返回错误
    pub fn reload(&self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        match self.provider.fetch() {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
                *guard = snapshot.clone();
                info!(
                    placements = snapshot.unit_ids.len(),
                    high_floors = snapshot.high_floor_unit_ids.len(),
                    waterfall = snapshot.waterfall.enabled,
                    "ad config reloaded"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "ad config reload failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
