//! HTTP API 层
//!
//! 对外暴露邀请码数据与按需刷新入口,
//! 路由与响应形态遵循既有前端的约定,不做重新设计。

pub mod handlers;
pub mod router;

pub use router::create_router;
