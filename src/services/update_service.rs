//! 更新编排服务
//!
//! 协调一轮完整的邀请码刷新:
//! 逐账号调用抓取器 → 汇总并标记来源 → 计算下次刷新时间 →
//! 全量替换持久化快照 → 同步更新状态记录。
//!
//! 单飞保证: 同一时间至多一轮在执行,并发触发直接no-op。

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::AccountCredential;
use crate::models::errors::StorageError;
use crate::models::invite_code::DataSnapshot;
use crate::services::data_store::DataStore;
use crate::services::scrape_service::InviteScraper;
use crate::state::{write_status, SharedStatus};

/// 下次刷新延迟的抖动下界 (分钟)
const JITTER_MIN_MINUTES: i64 = 10;
/// 下次刷新延迟的抖动上界 (分钟)
const JITTER_MAX_MINUTES: i64 = 20;

/// 更新编排器
pub struct UpdateService {
    scraper: Arc<dyn InviteScraper>,
    store: Arc<DataStore>,
    status: SharedStatus,
    accounts: Vec<AccountCredential>,

    /// 单飞锁: try_lock失败即表示已有周期在运行
    flight: Mutex<()>,
}

impl UpdateService {
    pub fn new(
        scraper: Arc<dyn InviteScraper>,
        store: Arc<DataStore>,
        status: SharedStatus,
        accounts: Vec<AccountCredential>,
    ) -> Self {
        Self {
            scraper,
            store,
            status,
            accounts,
            flight: Mutex::new(()),
        }
    }

    /// 执行一轮完整的更新周期
    ///
    /// 返回:
    /// - `Ok(Some(snapshot))`: 周期完成,快照已持久化
    /// - `Ok(None)`: 已有周期在运行,本次调用no-op
    /// - `Err(_)`: 持久化失败,快照未更新
    ///
    /// 无论哪条路径,退出时 is_updating/current_step 都会被复位。
    pub async fn run_update_cycle(&self) -> Result<Option<DataSnapshot>, StorageError> {
        let Ok(_guard) = self.flight.try_lock() else {
            info!("已有更新任务在运行中");
            return Ok(None);
        };

        write_status(&self.status, |status| {
            status.is_updating = true;
            status.last_error = None;
        });

        let result = self.execute_cycle().await;

        write_status(&self.status, |status| {
            status.is_updating = false;
            status.current_step = None;
            if let Err(e) = &result {
                status.last_error = Some(format!("更新邀请码失败: {}", e));
            }
        });

        result.map(Some)
    }

    /// 周期主体: 逐账号抓取、汇总、持久化
    async fn execute_cycle(&self) -> Result<DataSnapshot, StorageError> {
        let update_time = Utc::now().to_rfc3339();
        let mut all_codes = Vec::new();

        // 账号之间严格串行,同一时刻只有一个浏览器进程;
        // 单个账号失败记入状态后继续,不中断其余账号
        for account in &self.accounts {
            info!(account = %account.label, "开始抓取账号邀请码");
            match self
                .scraper
                .scrape(&account.identity, &account.password)
                .await
            {
                Ok(codes) => {
                    info!(
                        account = %account.label,
                        count = codes.len(),
                        "账号抓取完成"
                    );
                    all_codes.extend(
                        codes
                            .into_iter()
                            .map(|code| code.with_source(&account.label)),
                    );
                }
                Err(e) => {
                    let error_msg = format!("{}获取邀请码失败: {}", account.label, e);
                    error!("{}", error_msg);
                    write_status(&self.status, |status| {
                        // 首个错误优先,后续失败不覆盖
                        if status.last_error.is_none() {
                            status.last_error = Some(error_msg);
                        }
                    });
                }
            }
        }

        let minutes = jitter_minutes();
        let next_update = Utc::now() + chrono::Duration::minutes(minutes);
        let next_update_timestamp = next_update.timestamp_millis();
        info!("下次更新时间设置为 {} 分钟后", minutes);

        // 即使一个码都没抓到也全量替换快照,时间戳前移让调度持续运转
        let snapshot = DataSnapshot {
            codes: all_codes,
            last_update: Some(update_time),
            next_update: Some(next_update_timestamp),
        };
        self.store.save(&snapshot).await?;

        write_status(&self.status, |status| {
            status.last_update_time = snapshot.last_update.clone();
            status.next_update_time = snapshot.next_update;
        });

        Ok(snapshot)
    }
}

/// 刷新延迟抖动: [10, 20] 分钟内的随机整数
fn jitter_minutes() -> i64 {
    rand::thread_rng().gen_range(JITTER_MIN_MINUTES..=JITTER_MAX_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_minutes_stays_in_range() {
        for _ in 0..1000 {
            let minutes = jitter_minutes();
            assert!((JITTER_MIN_MINUTES..=JITTER_MAX_MINUTES).contains(&minutes));
        }
    }
}
