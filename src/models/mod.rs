//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (浏览器自动化、持久化错误)
//! - invite_code: 邀请码与数据快照 (唯一持久化聚合)
//! - update_status: 更新状态跟踪 (进程级只读视图)

pub mod errors;
pub mod invite_code;
pub mod update_status;

pub use errors::{AutomationError, StorageError};
pub use invite_code::{parse_invite_code_text, DataSnapshot, InviteCode};
pub use update_status::UpdateStatus;
