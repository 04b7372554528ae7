//! Coze邀请码自动获取服务
//!
//! 通过无头浏览器驱动目标平台的登录与导航流程,
//! 定时抓取邀请码并经由HTTP API分发。
//!
//! # 架构
//!
//! - [`services`]: 抓取、存储、编排与调度的业务核心
//! - [`models`]: 数据快照、邀请码与错误类型
//! - [`api`]: axum HTTP 边界
//! - [`state`]: 全局共享状态
//! - [`config`]: 环境变量配置

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
