//! Web端点模块
//!
//! 提供存活检查和统计查询的HTTP API

use crate::health::{HealthStats, PingService};
use serde::Serialize;

pub mod handlers;
pub mod server;

pub use server::{build_router, serve_web};

/// Web服务器状态
#[derive(Clone)]
pub struct WebAppState {
    /// 探测服务句柄
    pub service: PingService,
}

impl WebAppState {
    /// 创建新的Web服务器状态
    pub fn new(service: PingService) -> Self {
        Self { service }
    }
}

/// API响应包装器
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 是否成功
    pub success: bool,
    /// 响应数据
    pub data: Option<T>,
    /// 错误信息
    pub error: Option<String>,
    /// 时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// 创建错误响应
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// 统计查询响应
#[derive(Debug, Serialize)]
pub struct StatsPayload {
    /// 调度是否运行中
    pub running: bool,
    /// 探测URL
    pub url: String,
    /// 统计快照
    pub stats: HealthStats,
    /// 成功率（百分比）
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<()> = ApiResponse::error("test error".to_string());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("test error".to_string()));
    }
}
