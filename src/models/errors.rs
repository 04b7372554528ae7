use thiserror::Error;

/// 浏览器自动化相关错误
///
/// 覆盖一轮抓取中每个可能失败的环节。
/// 会话/导航/超时类瞬时故障会触发整轮重试,
/// 登录入口缺失属于页面内容问题,重试无意义。
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 浏览器启动失败
    ///
    /// 可能原因:
    /// - Chromium 未安装或不在 PATH 中
    /// - 系统资源不足
    #[error("浏览器启动失败: {0}")]
    LaunchFailed(String),

    /// 页面导航失败
    ///
    /// 打开目标页面或等待跳转时出错
    #[error("页面导航失败: {0}")]
    NavigationFailed(String),

    /// 页面脚本执行失败
    #[error("脚本执行失败: {0}")]
    ScriptFailed(String),

    /// 等待页面状态或元素超时
    #[error("等待{what}超时 ({seconds}秒)")]
    WaitTimeout { what: String, seconds: u64 },

    /// 页面元素操作失败
    ///
    /// 点击、输入等交互动作出错
    #[error("页面元素操作失败: {0}")]
    ElementFailed(String),

    /// 登录入口未找到
    ///
    /// 文本查找与元素遍历两种策略均失败,本轮无法继续
    #[error("无法找到登录按钮")]
    LoginEntryNotFound,
}

impl AutomationError {
    /// 是否属于可重试的瞬时故障
    ///
    /// 登录入口缺失说明页面已正常加载但内容不符合预期,
    /// 重开会话也不会改变结果,直接放弃本轮。
    pub fn is_transient(&self) -> bool {
        !matches!(self, AutomationError::LoginEntryNotFound)
    }
}

/// 持久化相关错误
///
/// 读取失败在存储层内部降级为空快照,不会以错误形式传播;
/// 写入失败向上传播并中止本轮更新。
#[derive(Debug, Error)]
pub enum StorageError {
    /// 数据文件写入失败
    #[error("数据文件写入失败: {0}")]
    WriteFailed(String),

    /// 序列化/反序列化失败
    #[error("数据序列化失败: {0}")]
    SerializationError(String),
}

/// 实现从serde_json::Error到StorageError的转换
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
