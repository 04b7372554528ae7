//! 邀请码抓取服务 - 核心业务逻辑
//!
//! 驱动浏览器完成一套固定的登录/导航/提取序列:
//! 打开登录页 → 点击登录入口 → 账号密码登录 → 跳转工作台 →
//! 穿过可选的引导弹窗 → 两级策略提取邀请码。
//!
//! 每一步都有独立超时,任何一步都可能失败;
//! 瞬时故障(启动/导航/超时)触发整轮重试,提取未命中只记零结果。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::page::{Page, ScreenshotParams};
use chromiumoxide::Element;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::models::errors::AutomationError;
use crate::models::invite_code::{parse_invite_code_text, InviteCode, STATUS_UNKNOWN};
use crate::services::browser_service::{BrowserSession, USER_AGENT};
use crate::state::{write_status, SharedStatus};

/// 目标平台登录页
const LOGIN_URL: &str = "https://www.coze.cn/space-preview?";
/// 整轮抓取的最大尝试次数
const MAX_ATTEMPTS: u32 = 3;
/// 两次尝试之间的间隔
const RETRY_DELAY: Duration = Duration::from_secs(5);
/// 单步等待超时
const WAIT_TIMEOUT: Duration = Duration::from_secs(30);
/// 元素轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 登录对话框
const LOGIN_DIALOG_SELECTOR: &str = r#"div[role="dialog"]"#;
/// 账号密码登录页签
const ACCOUNT_TAB_SELECTOR: &str = "#arco-tabs-0-tab-1";
/// 身份输入框
const IDENTITY_INPUT_SELECTOR: &str = "#Identity_input";
/// 密码输入框
const PASSWORD_INPUT_SELECTOR: &str = "#Password_input";
/// 登录提交按钮
const SUBMIT_BUTTON_SELECTOR: &str =
    "#arco-tabs-0-panel-1 > div > div > form > div:nth-child(6) > button";
/// 邀请码容器 (备用提取路径)
const INVITE_CONTAINER_SELECTOR: &str = r#"div[class*="invite-code"]"#;

/// 登录按钮的文本查找脚本: 遍历所有button找到含"登录"字样的并点击
const CLICK_LOGIN_JS: &str = r#"
(() => {
    const btn = Array.from(document.querySelectorAll('button'))
        .find(b => b.textContent.includes('登录'));
    if (!btn) return false;
    btn.click();
    return true;
})()
"#;

/// 邀请码批量提取脚本
const EXTRACT_CODES_JS: &str =
    r#"Array.from(document.querySelectorAll(".invite-code-item")).map(el => el.innerText)"#;

/// 备用提取路径的选择器策略: 按顺序尝试的 (码选择器, 状态选择器) 组合,
/// 任一组合取到非空邀请码即停止
const SELECTOR_STRATEGIES: &[(&str, &str)] = &[
    (
        ".items-center.coz-fg-plus",
        "div > div > div > div:nth-child(2) > div > span",
    ),
    (
        r#"div[class*="invite-code"] > div.coz-fg-plus"#,
        r#"div[class*="invite-code"] > div > button > div > span"#,
    ),
];

/// 邀请码抓取器
///
/// 编排层通过该trait调用抓取,测试用mock实现替换浏览器
#[async_trait]
pub trait InviteScraper: Send + Sync {
    /// 抓取一个账号的全部邀请码
    ///
    /// 返回的条目尚未标记来源,由编排层补填
    async fn scrape(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<Vec<InviteCode>, AutomationError>;
}

/// 基于 Chromium 的抓取器实现
pub struct ChromeScraper {
    /// 诊断截图输出目录
    screenshot_dir: PathBuf,

    /// 共享状态句柄,抓取里程碑写入 current_step
    status: SharedStatus,
}

#[async_trait]
impl InviteScraper for ChromeScraper {
    async fn scrape(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<Vec<InviteCode>, AutomationError> {
        let mut attempt = 1;
        loop {
            match self.scrape_once(account_id, password).await {
                Ok(codes) => return Ok(codes),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "操作失败,{}秒后尝试第{}次重试: {}",
                        RETRY_DELAY.as_secs(),
                        attempt + 1,
                        e
                    );
                    sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        error!("重试{}次后仍然失败: {}", MAX_ATTEMPTS, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl ChromeScraper {
    pub fn new(screenshot_dir: PathBuf, status: SharedStatus) -> Self {
        Self {
            screenshot_dir,
            status,
        }
    }

    /// 单次完整抓取: 启动会话 → 执行协议 → 无条件释放会话
    async fn scrape_once(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<Vec<InviteCode>, AutomationError> {
        let session = BrowserSession::launch().await?;
        let result = self.run_protocol(session.browser(), account_id, password).await;
        session.close().await;
        result
    }

    /// 固定步骤的登录与提取序列
    ///
    /// 页面建立之后的任何一步失败,先对仍然存活的页面截图留证,
    /// 再把错误向上传播 (会话在调用方关闭,此处是截图的最后机会)
    async fn run_protocol(
        &self,
        browser: &Browser,
        account_id: &str,
        password: &str,
    ) -> Result<Vec<InviteCode>, AutomationError> {
        self.set_step("打开登录页面");
        let page = browser
            .new_page(LOGIN_URL)
            .await
            .map_err(|e| AutomationError::NavigationFailed(format!("创建页面失败: {}", e)))?;
        page.set_user_agent(USER_AGENT)
            .await
            .map_err(|e| AutomationError::NavigationFailed(format!("设置UserAgent失败: {}", e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| AutomationError::NavigationFailed(e.to_string()))?;

        match self.login_and_extract(&page, account_id, password).await {
            Ok(codes) => Ok(codes),
            Err(e) => {
                error!("抓取序列失败: {}", e);
                self.capture_screenshot(&page, "error_exception").await;
                Err(e)
            }
        }
    }

    /// 页面就绪后的登录与提取主体
    async fn login_and_extract(
        &self,
        page: &Page,
        account_id: &str,
        password: &str,
    ) -> Result<Vec<InviteCode>, AutomationError> {
        self.set_step("等待页面加载");
        wait_for_ready(page).await?;
        // 页面声明就绪后部分组件仍在异步渲染,固定静置
        sleep(Duration::from_secs(3)).await;

        self.set_step("点击登录按钮");
        self.click_login_entry(page).await?;

        self.set_step("等待登录对话框出现");
        wait_for_element(page, LOGIN_DIALOG_SELECTOR).await?;

        self.set_step("切换到账号登录");
        click_selector(page, ACCOUNT_TAB_SELECTOR).await?;

        self.set_step("输入账号信息");
        type_into(page, IDENTITY_INPUT_SELECTOR, account_id).await?;
        type_into(page, PASSWORD_INPUT_SELECTOR, password).await?;

        self.set_step("提交登录");
        click_selector(page, SUBMIT_BUTTON_SELECTOR).await?;

        self.set_step("等待登录完成");
        wait_for_url_contains(page, "space").await?;
        wait_for_ready(page).await?;
        // 登录后工作台异步加载,等足时间再操作
        sleep(Duration::from_secs(5)).await;

        // 两个引导弹窗都是可选的: 账号可能早已走过引导流程,找不到不算失败
        self.set_step("点击快速开始");
        match click_element_with_text(page, "div", "快速开始").await {
            Ok(()) => sleep(Duration::from_secs(2)).await,
            Err(e) => warn!("点击快速开始按钮失败: {}", e),
        }

        self.set_step("点击立即邀请");
        match click_element_with_text(page, "button", "立即邀请").await {
            Ok(()) => sleep(Duration::from_secs(2)).await,
            Err(e) => warn!("点击立即邀请按钮失败: {}", e),
        }

        self.set_step("获取邀请码信息");
        sleep(Duration::from_secs(5)).await;
        let codes = self.extract_codes(page).await;
        if codes.is_empty() {
            warn!("未找到任何邀请码");
        }
        Ok(codes)
    }

    /// 定位并点击登录入口
    ///
    /// 策略1: JS按文本内容查找 (已验证有效)
    /// 策略2: 遍历button元素按可见文本匹配
    /// 两者都失败则截图留证后放弃本轮
    async fn click_login_entry(&self, page: &Page) -> Result<(), AutomationError> {
        match page.evaluate(CLICK_LOGIN_JS).await {
            Ok(result) => {
                if result.into_value::<bool>().unwrap_or(false) {
                    info!("使用JavaScript查找并点击登录按钮");
                    return Ok(());
                }
                warn!("JavaScript未命中登录按钮,尝试备用方法");
            }
            Err(e) => warn!("JavaScript点击失败: {}", e),
        }

        if let Ok(buttons) = page.find_elements("button").await {
            for button in buttons {
                let text = button.inner_text().await.ok().flatten().unwrap_or_default();
                if text.contains("登录") {
                    button.click().await.map_err(|e| {
                        AutomationError::ElementFailed(format!("点击登录按钮失败: {}", e))
                    })?;
                    info!("通过遍历找到并点击: {}", text);
                    return Ok(());
                }
            }
        }

        self.capture_screenshot(page, "error_screenshot").await;
        Err(AutomationError::LoginEntryNotFound)
    }

    /// 两级提取: 先JS批量取文本块,失败再逐容器按选择器策略提取
    ///
    /// 提取失败不向上传播错误,按"本账号零结果"处理
    async fn extract_codes(&self, page: &Page) -> Vec<InviteCode> {
        match page.evaluate(EXTRACT_CODES_JS).await {
            Ok(result) => match result.into_value::<Vec<String>>() {
                Ok(blocks) if !blocks.is_empty() => {
                    info!("使用 JavaScript 方法获取邀请码");
                    let codes = parse_code_blocks(&blocks);
                    if !codes.is_empty() {
                        return codes;
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("解析JavaScript提取结果失败: {}", e),
            },
            Err(e) => warn!("JavaScript 方法获取失败,尝试备用方法: {}", e),
        }

        self.extract_codes_from_containers(page).await
    }

    /// 备用提取路径: 定位离散容器,逐个尝试选择器策略
    async fn extract_codes_from_containers(&self, page: &Page) -> Vec<InviteCode> {
        info!("使用元素遍历方法获取邀请码");

        if let Err(e) = wait_for_element(page, INVITE_CONTAINER_SELECTOR).await {
            warn!("定位邀请码容器时出错: {}", e);
            self.capture_screenshot(page, "error_invite_codes").await;
            return Vec::new();
        }

        let containers = match page.find_elements(INVITE_CONTAINER_SELECTOR).await {
            Ok(containers) => containers,
            Err(e) => {
                warn!("定位邀请码容器时出错: {}", e);
                self.capture_screenshot(page, "error_invite_codes").await;
                return Vec::new();
            }
        };
        info!("找到 {} 个邀请码容器", containers.len());

        let mut codes = Vec::new();
        for container in containers {
            if let Err(e) = container.scroll_into_view().await {
                warn!("滚动到邀请码元素时出错: {}", e);
                continue;
            }
            sleep(Duration::from_millis(500)).await;

            for (code_selector, status_selector) in SELECTOR_STRATEGIES {
                let Some(code) = element_text(&container, code_selector).await else {
                    continue;
                };
                let Some(status) = element_text(&container, status_selector).await else {
                    continue;
                };
                // 只要有code就收录,状态缺失时落默认值
                if !code.is_empty() {
                    let status = if status.is_empty() {
                        STATUS_UNKNOWN.to_string()
                    } else {
                        status
                    };
                    codes.push(InviteCode::new(code, status));
                    break;
                }
            }
        }
        codes
    }

    /// 保存诊断截图,文件名带时间戳
    ///
    /// 截图本身是尽力而为: 任何失败只记日志
    async fn capture_screenshot(&self, page: &Page, prefix: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.screenshot_dir) {
            warn!("创建截图目录失败: {}", e);
            return;
        }

        let path = self.screenshot_dir.join(screenshot_filename(prefix));

        match page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), &path)
            .await
        {
            Ok(_) => info!("已保存错误截图到 {}", path.display()),
            Err(e) => warn!("保存截图失败: {}", e),
        }
    }

    /// 记录当前抓取里程碑
    fn set_step(&self, step: &str) {
        info!("当前步骤: {}", step);
        write_status(&self.status, |status| {
            status.current_step = Some(step.to_string());
        });
    }
}

/// 截图文件名: 前缀加秒级时间戳,同一前缀的多次截图互不覆盖
fn screenshot_filename(prefix: &str) -> String {
    format!(
        "{}_{}.png",
        prefix,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// 解析批量提取到的文本块
fn parse_code_blocks(blocks: &[String]) -> Vec<InviteCode> {
    let mut codes = Vec::new();
    for block in blocks {
        if let Some((code, status)) = parse_invite_code_text(block) {
            info!("邀请码: {}, 状态: {}", code, status);
            codes.push(InviteCode::new(code, status));
        }
    }
    codes
}

/// 等待 document.readyState 变为 complete
async fn wait_for_ready(page: &Page) -> Result<(), AutomationError> {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    loop {
        let ready = match page.evaluate("document.readyState").await {
            Ok(result) => result
                .into_value::<String>()
                .map(|state| state == "complete")
                .unwrap_or(false),
            Err(_) => false,
        };
        if ready {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AutomationError::WaitTimeout {
                what: "页面加载完成".to_string(),
                seconds: WAIT_TIMEOUT.as_secs(),
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// 等待页面URL包含指定片段 (登录跳转完成的判定)
async fn wait_for_url_contains(page: &Page, needle: &str) -> Result<(), AutomationError> {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    loop {
        if matches!(page.url().await, Ok(Some(url)) if url.contains(needle)) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AutomationError::WaitTimeout {
                what: format!("URL包含 {}", needle),
                seconds: WAIT_TIMEOUT.as_secs(),
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// 轮询等待选择器命中并返回元素
async fn wait_for_element(page: &Page, selector: &str) -> Result<Element, AutomationError> {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if Instant::now() >= deadline {
            return Err(AutomationError::WaitTimeout {
                what: format!("元素 {}", selector),
                seconds: WAIT_TIMEOUT.as_secs(),
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// 等待并点击选择器对应的元素
async fn click_selector(page: &Page, selector: &str) -> Result<(), AutomationError> {
    let element = wait_for_element(page, selector).await?;
    element
        .click()
        .await
        .map_err(|e| AutomationError::ElementFailed(format!("点击 {} 失败: {}", selector, e)))?;
    Ok(())
}

/// 等待输入框出现并键入文本
async fn type_into(page: &Page, selector: &str, text: &str) -> Result<(), AutomationError> {
    let element = wait_for_element(page, selector).await?;
    // 先点击聚焦,部分输入组件不聚焦收不到按键
    let _ = element.click().await;
    element
        .type_str(text)
        .await
        .map_err(|e| AutomationError::ElementFailed(format!("输入 {} 失败: {}", selector, e)))?;
    Ok(())
}

/// 按可见文本查找指定标签的元素并点击
async fn click_element_with_text(
    page: &Page,
    tag: &str,
    text: &str,
) -> Result<(), AutomationError> {
    let elements = page
        .find_elements(tag)
        .await
        .map_err(|e| AutomationError::ElementFailed(format!("查找 {} 元素失败: {}", tag, e)))?;

    for element in elements {
        let content = element.inner_text().await.ok().flatten().unwrap_or_default();
        if content.contains(text) {
            element.click().await.map_err(|e| {
                AutomationError::ElementFailed(format!("点击 {} 失败: {}", text, e))
            })?;
            return Ok(());
        }
    }

    Err(AutomationError::ElementFailed(format!(
        "未找到含\"{}\"的{}元素",
        text, tag
    )))
}

/// 读取子元素的文本,元素缺失返回 None
async fn element_text(container: &Element, selector: &str) -> Option<String> {
    let element = container.find_element(selector).await.ok()?;
    Some(
        element
            .inner_text()
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
            .trim()
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_blocks_skips_blank_entries() {
        let blocks = vec![
            "ABC123\n未激活".to_string(),
            "   ".to_string(),
            "XYZ999".to_string(),
        ];

        let codes = parse_code_blocks(&blocks);

        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].code, "ABC123");
        assert_eq!(codes[0].status, "未激活");
        assert_eq!(codes[1].code, "XYZ999");
        assert_eq!(codes[1].status, STATUS_UNKNOWN);
    }

    #[test]
    fn test_parse_code_blocks_splits_comma_separated_lines() {
        let blocks = vec!["ABC123,未激活".to_string()];

        let codes = parse_code_blocks(&blocks);

        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].code, "ABC123");
        assert_eq!(codes[0].status, "未激活");
    }

    #[test]
    fn test_screenshot_filename_carries_prefix_and_timestamp() {
        let name = screenshot_filename("error_exception");

        assert!(name.starts_with("error_exception_"));
        assert!(name.ends_with(".png"));
        // 时间戳部分形如 20260826_103000
        let stamp = &name["error_exception_".len()..name.len() - ".png".len()];
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
    }
}
