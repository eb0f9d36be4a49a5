//! Web 路由处理函数

use super::{ApiResponse, StatsPayload, WebAppState};
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::Json,
};

/// 存活检查
pub async fn healthz() -> &'static str {
    "ok"
}

/// 统计查询
pub async fn stats(State(app_state): State<WebAppState>) -> Json<ApiResponse<StatsPayload>> {
    let stats = app_state.service.stats().await;
    let payload = StatsPayload {
        running: app_state.service.is_running().await,
        url: app_state.service.config().url.clone(),
        success_rate: stats.success_rate(),
        stats,
    };
    Json(ApiResponse::success(payload))
}

/// 未知路由
pub async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error(format!("未知路径: {}", uri.path()))),
    )
}
