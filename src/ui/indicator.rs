use tracing::debug;

use crate::model::placements::{AdFormat, PlacementKey};

/// 全屏加载遮罩。load_and_show 和轮询展示期间显示，结束时关闭。
pub trait LoadingIndicator: Send + Sync + 'static {
    fn show(&self, format: AdFormat, key: &PlacementKey);

    fn dismiss(&self, format: AdFormat, key: &PlacementKey);
}

/// 只打日志
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl LoadingIndicator for NoopIndicator {
    fn show(&self, format: AdFormat, key: &PlacementKey) {
        debug!(%format, placement = %key, "loading indicator shown");
    }

    fn dismiss(&self, format: AdFormat, key: &PlacementKey) {
        debug!(%format, placement = %key, "loading indicator dismissed");
    }
}
