//! 浏览器会话管理
//!
//! 职责:
//! - 以确定性配置启动无头 Chromium 实例
//! - 会话结束后释放浏览器并兜底清理残留进程
//!
//! 每轮抓取独立启动和销毁一个会话,不做全局单例:
//! 登录态、对话框等页面状态不能在账号之间串扰。

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::errors::AutomationError;

/// 固定User-Agent: 模拟常规桌面Chrome,降低被识别为自动化的概率
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// CDP请求超时上限
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// 一次抓取独占的浏览器会话
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// 启动无头浏览器
    ///
    /// 固定视口 1920x1080,关闭自动化检测特征与各类弹窗干扰
    pub async fn launch() -> Result<Self, AutomationError> {
        info!("启动新 Chromium 实例");

        let config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .args(vec![
                "--disable-dev-shm-usage",
                "--disable-blink-features=AutomationControlled",
                "--disable-extensions",
                "--disable-infobars",
                "--disable-popup-blocking",
                "--disable-gpu",
                "--disable-setuid-sandbox",
                "--disable-software-rasterizer",
            ])
            .request_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AutomationError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;

        // 后台任务消费CDP事件流,会话关闭后自然退出
        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
            debug!("浏览器事件处理器已退出");
        });

        info!("Chromium 实例启动成功");
        Ok(Self {
            browser,
            handler_task,
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// 关闭浏览器并清理残留进程
    ///
    /// 无论抓取成败都必须调用,异常中断的会话可能泄露浏览器进程
    pub async fn close(mut self) {
        info!("正在关闭浏览器...");
        if let Err(e) = self.browser.close().await {
            warn!("关闭浏览器时出错: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("等待浏览器进程退出时出错: {}", e);
        }
        self.handler_task.abort();
        info!("浏览器已关闭");

        kill_stray_processes();
    }
}

/// 尽力终止残留的 Chrome/ChromeDriver 进程
///
/// 按进程名匹配,清理失败只记日志不影响主流程
#[cfg(unix)]
fn kill_stray_processes() {
    for name in ["chromedriver", "chrome"] {
        if let Err(e) = std::process::Command::new("pkill")
            .arg("-f")
            .arg(name)
            .status()
        {
            warn!("清理 {} 进程时出错: {}", name, e);
        }
    }
    info!("已清理可能残留的Chrome进程");
}

#[cfg(not(unix))]
fn kill_stray_processes() {}
