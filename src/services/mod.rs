//! 服务层模块
//!
//! 包含所有业务逻辑服务:
//! - `browser_service`: 浏览器会话的启动、配置与释放
//! - `scrape_service`: 登录/导航/提取的固定抓取序列与重试
//! - `data_store`: JSON快照存储、单槽缓存与消费路径
//! - `update_service`: 单飞更新周期的编排
//! - `scheduler`: 自重新武装的定时刷新循环
//!
//! # 控制流
//!
//! ```text
//! Scheduler ──▶ UpdateService ──▶ InviteScraper (×N账号)
//!                    │                  │
//!                    ▼                  ▼
//!               DataStore ◀──── BrowserSession
//!                    │
//!              缓存失效 + 状态更新
//! ```
//!
//! API读取走 DataStore 缓存;无可用码时API在独立任务中
//! 异步触发一轮 UpdateService 周期,不阻塞请求方。

pub mod browser_service;
pub mod data_store;
pub mod scheduler;
pub mod scrape_service;
pub mod update_service;

// 重导出常用类型,简化外部引用
pub use browser_service::BrowserSession;
pub use data_store::DataStore;
pub use scheduler::Scheduler;
pub use scrape_service::{ChromeScraper, InviteScraper};
pub use update_service::UpdateService;
