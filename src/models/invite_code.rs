use serde::{Deserialize, Serialize};

/// 可消费标记: 状态文本含有该子串的邀请码视为未使用
pub const STATUS_UNUSED: &str = "未激活";
/// 消费后写回的状态值
pub const STATUS_ACTIVATED: &str = "已激活";
/// 解析不出状态文本时的默认值
pub const STATUS_UNKNOWN: &str = "未知状态";
/// 缺失来源字段时的默认值
pub const SOURCE_UNKNOWN: &str = "未知";

/// 邀请码
///
/// 从目标平台页面抓取的访问令牌。状态为自由文本,
/// 仅"未激活"/"已激活"两种取值参与消费流转,其余值只作展示。
/// 邀请码不做去重,重复抓取可能产生重复条目。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteCode {
    /// 邀请码本体
    pub code: String,

    /// 状态文本 (如: 未激活 / 已激活)
    pub status: String,

    /// 来源账号标签 (如: 账号1)
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    SOURCE_UNKNOWN.to_string()
}

impl InviteCode {
    /// 创建新的邀请码条目,来源待编排层补填
    pub fn new(code: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            status: status.into(),
            source: default_source(),
        }
    }

    /// 标记来源账号
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    /// 是否可被消费
    pub fn is_unused(&self) -> bool {
        self.status.contains(STATUS_UNUSED)
    }

    /// 置为已激活状态
    pub fn activate(&mut self) {
        self.status = STATUS_ACTIVATED.to_string();
    }
}

/// 数据快照
///
/// 唯一的持久化聚合,每轮成功更新整体替换(不做合并)。
/// 磁盘上的文档始终反映最近一次成功的抓取周期,
/// 失败的周期不触碰已有快照。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSnapshot {
    /// 邀请码列表,保持抓取顺序
    #[serde(default)]
    pub codes: Vec<InviteCode>,

    /// 上次更新时间 (ISO-8601)
    #[serde(default)]
    pub last_update: Option<String>,

    /// 下次更新时间 (毫秒时间戳)
    #[serde(default)]
    pub next_update: Option<i64>,
}

impl DataSnapshot {
    /// 查找第一个未激活条目的下标
    pub fn first_unused_index(&self) -> Option<usize> {
        self.codes.iter().position(|c| c.is_unused())
    }
}

/// 安全解析邀请码文本块
///
/// 页面批量提取返回的原始文本格式不稳定,按宽容规则拆分:
/// - 多行: 第一行为邀请码,其余行合并为状态
/// - 单行: 先按首个空格拆分,再按首个逗号拆分
/// - 无法拆分: 整行作为邀请码,状态为"未知状态"
/// - 空白文本: 返回 None
pub fn parse_invite_code_text(text: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [] => None,
        [single] => {
            if let Some((code, status)) = single.split_once(' ') {
                return Some((code.trim().to_string(), status.trim().to_string()));
            }
            if let Some((code, status)) = single.split_once(',') {
                return Some((code.trim().to_string(), status.trim().to_string()));
            }
            Some((single.to_string(), STATUS_UNKNOWN.to_string()))
        }
        [code, rest @ ..] => Some((code.to_string(), rest.join(" "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_line_block() {
        let parsed = parse_invite_code_text("XYZ999\n已激活");
        assert_eq!(
            parsed,
            Some(("XYZ999".to_string(), "已激活".to_string()))
        );
    }

    #[test]
    fn test_parse_single_line_space_separated() {
        let parsed = parse_invite_code_text("XYZ999 已激活");
        assert_eq!(
            parsed,
            Some(("XYZ999".to_string(), "已激活".to_string()))
        );
    }

    #[test]
    fn test_parse_single_line_comma_separated() {
        let parsed = parse_invite_code_text("XYZ999,已激活");
        assert_eq!(
            parsed,
            Some(("XYZ999".to_string(), "已激活".to_string()))
        );
    }

    #[test]
    fn test_parse_bare_code_defaults_to_unknown_status() {
        let parsed = parse_invite_code_text("XYZ999");
        assert_eq!(
            parsed,
            Some(("XYZ999".to_string(), STATUS_UNKNOWN.to_string()))
        );
    }

    #[test]
    fn test_parse_multi_line_joins_status_lines() {
        let parsed = parse_invite_code_text("  ABC123  \n未激活\n限时有效\n");
        assert_eq!(
            parsed,
            Some(("ABC123".to_string(), "未激活 限时有效".to_string()))
        );
    }

    #[test]
    fn test_parse_blank_text_yields_none() {
        assert_eq!(parse_invite_code_text(""), None);
        assert_eq!(parse_invite_code_text("  \n  "), None);
    }

    #[test]
    fn test_unused_detection_is_substring_based() {
        let code = InviteCode::new("ABC123", "未激活(3天内有效)");
        assert!(code.is_unused());

        let used = InviteCode::new("ABC123", "已激活");
        assert!(!used.is_unused());
    }

    #[test]
    fn test_activate_transitions_status() {
        let mut code = InviteCode::new("ABC123", STATUS_UNUSED);
        code.activate();
        assert_eq!(code.status, STATUS_ACTIVATED);
    }

    #[test]
    fn test_snapshot_deserializes_without_source() {
        let json = r#"{"codes":[{"code":"A","status":"未激活"}],"last_update":null,"next_update":null}"#;
        let snapshot: DataSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.codes[0].source, SOURCE_UNKNOWN);
    }

    #[test]
    fn test_first_unused_index_preserves_order() {
        let snapshot = DataSnapshot {
            codes: vec![
                InviteCode::new("A", STATUS_ACTIVATED),
                InviteCode::new("B", STATUS_UNUSED),
                InviteCode::new("C", STATUS_UNUSED),
            ],
            ..Default::default()
        };
        assert_eq!(snapshot.first_unused_index(), Some(1));
    }
}
