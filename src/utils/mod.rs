//! 工具模块
//!
//! - logger: 结构化日志初始化

pub mod logger;
