//! 邀请码 API 处理器
//!
//! 三个端点对应三种读取姿势:
//! - /api/codes: 完整快照
//! - /api/invite_codes: 更新状态与码列表的合并视图
//! - /api/get_invite_code: 消费一个未激活码,必要时异步触发刷新

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::models::invite_code::{DataSnapshot, InviteCode};
use crate::state::{read_status, AppState};

/// 状态与邀请码的合并视图
#[derive(Debug, Serialize)]
pub struct InviteCodesResponse {
    pub is_updating: bool,
    pub current_step: Option<String>,
    pub last_update_time: Option<String>,
    pub next_update_time: Option<i64>,
    pub last_error: Option<String>,
    pub codes: Vec<InviteCode>,
}

/// 消费端点的响应体
#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
}

/// GET /health - 存活探针
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/codes - 完整快照 (经缓存)
pub async fn get_codes(State(state): State<AppState>) -> Json<DataSnapshot> {
    Json(state.store.load().await)
}

/// GET /api/invite_codes - 更新状态与邀请码数据
pub async fn get_invite_codes(State(state): State<AppState>) -> Json<InviteCodesResponse> {
    let data = state.store.load().await;
    let status = read_status(&state.status);

    Json(InviteCodesResponse {
        is_updating: status.is_updating,
        current_step: status.current_step,
        last_update_time: status.last_update_time,
        next_update_time: status.next_update_time,
        last_error: status.last_error,
        codes: data.codes,
    })
}

/// GET /api/get_invite_code - 消费一个未激活邀请码
///
/// - 找到可用码: 200,返回激活后的条目
/// - 更新进行中: 423,附带当前步骤
/// - 无可用码: 异步触发一轮刷新并返回202,不阻塞请求方
/// - 持久化失败: 500
pub async fn get_unused_invite_code(
    State(state): State<AppState>,
) -> (StatusCode, Json<ConsumeResponse>) {
    match state.store.consume_unused_code().await {
        Ok(Some(code)) => (
            StatusCode::OK,
            Json(ConsumeResponse {
                success: true,
                code: Some(code.code),
                status: Some(code.status),
                source: Some(code.source),
                message: "获取邀请码成功".to_string(),
                current_step: None,
            }),
        ),
        Ok(None) => {
            let status = read_status(&state.status);
            if status.is_updating {
                return (
                    StatusCode::LOCKED,
                    Json(ConsumeResponse {
                        success: false,
                        code: None,
                        status: None,
                        source: None,
                        message: "正在更新邀请码数据,请稍后再试".to_string(),
                        current_step: status.current_step,
                    }),
                );
            }

            // 在独立任务中触发更新,当前请求立即返回
            let updater = Arc::clone(&state.updater);
            tokio::spawn(async move {
                if let Err(e) = updater.run_update_cycle().await {
                    error!("更新线程中出错: {}", e);
                }
            });

            (
                StatusCode::ACCEPTED,
                Json(ConsumeResponse {
                    success: false,
                    code: None,
                    status: None,
                    source: None,
                    message: "没有可用的邀请码,已触发更新,请稍后再试".to_string(),
                    current_step: None,
                }),
            )
        }
        Err(e) => {
            error!("获取邀请码失败: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ConsumeResponse {
                    success: false,
                    code: None,
                    status: None,
                    source: None,
                    message: format!("获取邀请码失败: {}", e),
                    current_step: None,
                }),
            )
        }
    }
}
