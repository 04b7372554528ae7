use anyhow::Context;
use tracing::info;

use coze_invite::api::create_router;
use coze_invite::config::AppConfig;
use coze_invite::services::Scheduler;
use coze_invite::state::AppState;
use coze_invite::utils::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 初始化日志系统
    logger::init().context("日志系统初始化失败")?;

    // 加载配置
    let config = AppConfig::from_env();
    let addr = format!("{}:{}", config.server_addr, config.server_port);

    info!("应用启动,配置账号数量: {}", config.accounts.len());

    if let Some(data_dir) = config.data_file.parent() {
        std::fs::create_dir_all(data_dir).context("无法创建数据目录")?;
    }

    // 初始化应用状态 (状态记录从已保存的快照播种)
    let state = AppState::new(&config).await;

    // 启动自动更新后台任务
    let _scheduler = Scheduler::new(state.updater.clone(), state.store.clone()).spawn();

    // 创建路由并启动服务器
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
