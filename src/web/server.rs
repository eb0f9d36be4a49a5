//! Web服务器实现
//!
//! 提供HTTP服务器和路由管理

use super::{handlers, WebAppState};
use crate::config::WebConfig;
use crate::health::PingService;
use anyhow::Context;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 创建路由
pub fn build_router(service: PingService) -> Router {
    let state = WebAppState::new(service);

    let api_routes = Router::new()
        .route("/stats", get(handlers::stats))
        .with_state(state);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest("/api/v1", api_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
}

/// 启动Web服务器，直到 `shutdown` 被取消
///
/// # 参数
/// * `config` - Web配置
/// * `service` - 探测服务句柄
/// * `shutdown` - 关闭信号
pub async fn serve_web(
    config: &WebConfig,
    service: PingService,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    if !config.enabled {
        info!("Web服务器已禁用");
        return Ok(());
    }

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定Web地址失败: {addr}"))?;
    info!("Web服务器已启动: http://{}", addr);

    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Web服务器运行失败")?;

    info!("Web服务器已关闭");
    Ok(())
}
