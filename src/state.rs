use std::sync::{Arc, RwLock};

use crate::config::AppConfig;
use crate::models::update_status::UpdateStatus;
use crate::services::{ChromeScraper, DataStore, UpdateService};

/// 共享的更新状态句柄
///
/// 写入方只有持有单飞锁的更新周期,API读取方拿到的是克隆快照。
/// 读写锁只在复制小结构体的瞬间持有,不跨越任何await点。
pub type SharedStatus = Arc<RwLock<UpdateStatus>>;

/// 在写锁下修改状态
///
/// 锁中毒时继续使用内部值: 状态是咨询性数据,残缺可容忍
pub fn write_status(status: &SharedStatus, f: impl FnOnce(&mut UpdateStatus)) {
    let mut guard = status.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard);
}

/// 读取状态的一份克隆快照
pub fn read_status(status: &SharedStatus) -> UpdateStatus {
    status
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// 应用全局状态
///
/// 每个字段代表应用核心能力的单一来源:
/// - store: 唯一的数据持久化入口
/// - updater: 唯一的刷新周期编排器
/// - status: 唯一的更新进度记录
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DataStore>,
    pub updater: Arc<UpdateService>,
    pub status: SharedStatus,
}

impl AppState {
    /// 初始化应用状态
    ///
    /// 状态记录从持久化快照播种时间字段,is_updating固定复位
    pub async fn new(config: &AppConfig) -> Self {
        let store = Arc::new(DataStore::new(config.data_file.clone()));

        let snapshot = store.load().await;
        let status: SharedStatus = Arc::new(RwLock::new(UpdateStatus::seeded_from(&snapshot)));

        let scraper = Arc::new(ChromeScraper::new(
            config.screenshot_dir.clone(),
            Arc::clone(&status),
        ));
        let updater = Arc::new(UpdateService::new(
            scraper,
            Arc::clone(&store),
            Arc::clone(&status),
            config.accounts.clone(),
        ));

        tracing::info!(
            data_file = %config.data_file.display(),
            accounts = config.accounts.len(),
            "AppState initialized"
        );

        Self {
            store,
            updater,
            status,
        }
    }
}
