// src/orchestrator/runtime.rs

use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedSender, WeakUnboundedSender};
use tokio::time::{sleep, sleep_until, Instant};

/// **actor 自己的邮箱**
///
/// 只持有弱引用：所有外部 handle 都被 drop 后 actor 能正常退出，
/// 此时还没到点的延迟消息直接丢弃。
pub(crate) struct Mailbox<M> {
    tx: WeakUnboundedSender<M>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M: Send + 'static> Mailbox<M> {
    pub fn new(tx: &UnboundedSender<M>) -> Self {
        Self { tx: tx.downgrade() }
    }

    pub fn post(&self, msg: M) {
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(msg);
        }
    }

    /// 延迟投递（退避重试、降级、轮询 tick、超时）
    pub fn post_after(&self, delay: Duration, msg: M) {
        if delay.is_zero() {
            self.post(msg);
            return;
        }
        let mailbox = self.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            mailbox.post(msg);
        });
    }

    /// 定点投递（TTL 过期）
    pub fn post_at(&self, deadline: Instant, msg: M) {
        let mailbox = self.clone();
        tokio::spawn(async move {
            sleep_until(deadline).await;
            mailbox.post(msg);
        });
    }

    /// 在独立任务里等待一个上游 future，完成后把结果包装成消息投递回来
    pub fn complete<T, F>(&self, future: BoxFuture<'static, T>, wrap: F)
    where
        T: Send + 'static,
        F: FnOnce(T) -> M + Send + 'static,
    {
        let mailbox = self.clone();
        tokio::spawn(async move {
            let value = future.await;
            mailbox.post(wrap(value));
        });
    }

    /// 把一个事件流逐个转发回来，流结束时再投递 `ended`
    pub fn forward<T, F>(&self, mut stream: BoxStream<'static, T>, wrap: F, ended: M)
    where
        T: Send + 'static,
        F: Fn(T) -> M + Send + 'static,
    {
        let mailbox = self.clone();
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                mailbox.post(wrap(item));
            }
            mailbox.post(ended);
        });
    }
}
