//! 定时刷新调度器
//!
//! 单个受监督的后台任务,不是固定间隔的cron:
//! 每轮执行完后读取快照的 next_update,计算相对"现在"的剩余延迟,
//! 重新武装一次定时等待。周期失败走固定兜底延迟,循环永不停摆。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::models::invite_code::DataSnapshot;
use crate::services::data_store::DataStore;
use crate::services::update_service::UpdateService;

/// 周期失败后的兜底重试延迟
const FALLBACK_DELAY: Duration = Duration::from_secs(15 * 60);
/// 最短重新武装延迟: 过期的 next_update 不允许空转
const MIN_DELAY: Duration = Duration::from_secs(60);

/// 刷新调度器
pub struct Scheduler {
    updater: Arc<UpdateService>,
    store: Arc<DataStore>,
}

impl Scheduler {
    pub fn new(updater: Arc<UpdateService>, store: Arc<DataStore>) -> Self {
        Self { updater, store }
    }

    /// 启动后台刷新循环
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        info!("启动定时任务");
        loop {
            let delay = match self.updater.run_update_cycle().await {
                Ok(Some(snapshot)) => delay_until_next_update(&snapshot),
                Ok(None) => {
                    // 本轮被API触发的周期抢了单飞锁,按磁盘快照重新对表
                    let snapshot = self.store.load().await;
                    delay_until_next_update(&snapshot)
                }
                Err(e) => {
                    error!("更新任务出错: {}", e);
                    FALLBACK_DELAY
                }
            };

            info!(delay_secs = delay.as_secs(), "下一轮刷新已定时");
            tokio::time::sleep(delay).await;
        }
    }
}

/// 根据快照计算距下次刷新的剩余延迟
///
/// next_update缺失走兜底延迟,已过期的时间戳收敛到最短延迟
fn delay_until_next_update(snapshot: &DataSnapshot) -> Duration {
    let Some(next_update_ms) = snapshot.next_update else {
        return FALLBACK_DELAY;
    };

    let remaining_ms = next_update_ms - Utc::now().timestamp_millis();
    if remaining_ms <= MIN_DELAY.as_millis() as i64 {
        MIN_DELAY
    } else {
        Duration::from_millis(remaining_ms as u64)
    }
}
