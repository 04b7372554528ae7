use serde::Serialize;

use crate::models::invite_code::DataSnapshot;

/// 更新状态跟踪
///
/// 进程级可变记录,不持久化。仅由持有单飞锁的更新周期写入,
/// API消费者读取到的是粗粒度的咨询性快照,不承诺读一致性。
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateStatus {
    /// 是否有更新周期正在执行
    pub is_updating: bool,

    /// 上次成功更新时间 (ISO-8601)
    pub last_update_time: Option<String>,

    /// 最近一次错误描述,多账号失败时保留首个
    pub last_error: Option<String>,

    /// 当前抓取步骤,每到一个里程碑即覆盖
    pub current_step: Option<String>,

    /// 下次计划更新时间 (毫秒时间戳)
    pub next_update_time: Option<i64>,
}

impl UpdateStatus {
    /// 进程启动时从持久化快照播种时间字段
    ///
    /// `is_updating` 固定复位为 false: 上一个进程遗留的状态不可信
    pub fn seeded_from(snapshot: &DataSnapshot) -> Self {
        Self {
            is_updating: false,
            last_update_time: snapshot.last_update.clone(),
            last_error: None,
            current_step: None,
            next_update_time: snapshot.next_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invite_code::{InviteCode, STATUS_UNUSED};

    #[test]
    fn test_seeded_from_copies_timestamps_only() {
        let snapshot = DataSnapshot {
            codes: vec![InviteCode::new("A", STATUS_UNUSED)],
            last_update: Some("2026-08-26T10:00:00+00:00".to_string()),
            next_update: Some(1_787_000_000_000),
        };

        let status = UpdateStatus::seeded_from(&snapshot);

        assert!(!status.is_updating);
        assert_eq!(status.current_step, None);
        assert_eq!(status.last_error, None);
        assert_eq!(
            status.last_update_time.as_deref(),
            Some("2026-08-26T10:00:00+00:00")
        );
        assert_eq!(status.next_update_time, Some(1_787_000_000_000));
    }

    #[test]
    fn test_seeded_from_empty_snapshot() {
        let status = UpdateStatus::seeded_from(&DataSnapshot::default());
        assert_eq!(status.last_update_time, None);
        assert_eq!(status.next_update_time, None);
    }
}
