//! 定时器封装模块
//!
//! 基于 `tokio::time::interval` 的周期任务，drop 时自动取消。

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// 周期性定时器
///
/// 第一次触发发生在一个完整周期之后。回调返回 `false` 时定时器自行结束。
/// 上一次回调未完成时不会开始下一次。
pub struct Interval {
    handle: JoinHandle<()>,
}

impl Interval {
    /// 创建新的周期性定时器
    ///
    /// # 参数
    /// - `period`: 间隔时间，必须大于零
    /// - `tick`: 每次间隔触发的回调
    ///
    /// # Panics
    /// 不在 tokio 运行时内调用，或 `period` 为零
    pub fn new<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !tick().await {
                    break;
                }
            }
        });

        Self { handle }
    }

    /// 取消定时器
    ///
    /// 通常不需要手动调用，因为 drop 时会自动取消。
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.cancel();
    }
}
