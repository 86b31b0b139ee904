pub mod http_client;
pub mod mock_network;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::model::creative::{Creative, CreativePayload, Reward};
use crate::model::placements::{AdFormat, UnitId};

pub use http_client::HttpAdNetwork;
pub use mock_network::{serve_mock_network, start_mock_network, MockNetworkSettings};

/// 全屏展示过程中上游回调的事件
#[derive(Debug, Clone, PartialEq)]
pub enum PresentEvent {
    Shown,
    Clicked,
    RewardEarned(Reward),
    Dismissed,
    FailedToShow(String),
}

/// **上游广告网络客户端**
///
/// 对编排器来说是不透明的：请求一个单元，得到 creative 或失败原因。
/// 返回 `'static` 的 future / stream，编排器把它们丢进独立任务，
/// 完成后再把结果投递回自己的邮箱。
pub trait AdNetwork: Send + Sync + 'static {
    fn request(
        &self,
        format: AdFormat,
        unit_id: &UnitId,
    ) -> BoxFuture<'static, Result<Creative, LoadError>>;

    /// 展示一个 creative，事件流以 `Dismissed` 或 `FailedToShow` 结束
    fn present(&self, creative: Creative) -> BoxStream<'static, PresentEvent>;

    /// 不再使用的 creative（过期、销毁、过期回调）交还给上游
    fn release(&self, creative: Creative);
}

/// `/ad` 接口的请求体
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdRequest {
    pub request_id: String,
    pub format: AdFormat,
    pub unit_id: UnitId,
}

/// `/ad` 接口的响应体
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdResponse {
    pub request_id: String,
    pub filled: bool,
    pub payload: Option<CreativePayload>,
}

/// `/impression` 接口的请求体
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ImpressionBeacon {
    pub creative_id: String,
    pub unit_id: UnitId,
    pub format: AdFormat,
}
