//! 探测结果数据结构
//!
//! 定义单次探测结果和滚动健康统计

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单次探测结果
///
/// `ok` 只表示"收到了响应"，是否健康由 [`HealthMonitor`](super::HealthMonitor) 判断。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 探测完成时间
    pub timestamp: DateTime<Utc>,
    /// 是否收到HTTP响应
    pub ok: bool,
    /// HTTP状态码（如果收到响应）
    pub status_code: Option<u16>,
    /// 耗时（毫秒）
    pub response_time_ms: u64,
    /// 错误信息（传输失败或超时）
    pub error_message: Option<String>,
}

impl ProbeResult {
    /// 创建收到响应的结果
    ///
    /// # 参数
    /// * `status_code` - HTTP状态码
    /// * `elapsed` - 耗时
    pub fn response(status_code: u16, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            ok: true,
            status_code: Some(status_code),
            response_time_ms: elapsed.as_millis() as u64,
            error_message: None,
        }
    }

    /// 创建传输失败或超时的结果
    ///
    /// # 参数
    /// * `error_message` - 错误信息，空字符串会被替换为 "unknown error"
    /// * `elapsed` - 耗时
    pub fn failure(error_message: impl Into<String>, elapsed: Duration) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = "unknown error".to_string();
        }
        Self {
            timestamp: Utc::now(),
            ok: false,
            status_code: None,
            response_time_ms: elapsed.as_millis() as u64,
            error_message: Some(error_message),
        }
    }
}

/// 滚动健康统计
///
/// 不变量：`total == successes + failures`，`skipped_overlaps` 不计入 `total`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStats {
    /// 服务创建时间
    pub start_time: DateTime<Utc>,
    /// 总探测次数
    pub total: u64,
    /// 成功次数
    pub successes: u64,
    /// 失败次数
    pub failures: u64,
    /// 连续失败次数
    pub consecutive_failures: u32,
    /// 最近一次失败的错误信息
    pub last_error: Option<String>,
    /// 最近一次的状态码
    pub last_status_code: Option<u16>,
    /// 最近一次的耗时（毫秒）
    pub last_response_time_ms: Option<u64>,
    /// 因上一次探测未完成而跳过的调度次数
    pub skipped_overlaps: u64,
}

impl HealthStats {
    /// 创建空的统计信息
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            total: 0,
            successes: 0,
            failures: 0,
            consecutive_failures: 0,
            last_error: None,
            last_status_code: None,
            last_response_time_ms: None,
            skipped_overlaps: 0,
        }
    }

    /// 成功率（百分比）
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.successes as f64 / self.total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_result_sets_status_code() {
        let result = ProbeResult::response(204, Duration::from_millis(12));
        assert!(result.ok);
        assert_eq!(result.status_code, Some(204));
        assert_eq!(result.response_time_ms, 12);
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_failure_result_always_has_message() {
        let result = ProbeResult::failure("", Duration::from_millis(50));
        assert!(!result.ok);
        assert!(result.status_code.is_none());
        assert_eq!(result.error_message.as_deref(), Some("unknown error"));

        let result = ProbeResult::failure("Connection refused", Duration::ZERO);
        assert_eq!(result.error_message.as_deref(), Some("Connection refused"));
    }

    #[test]
    fn test_success_rate() {
        let mut stats = HealthStats::new(Utc::now());
        assert_eq!(stats.success_rate(), 0.0);

        stats.total = 4;
        stats.successes = 3;
        stats.failures = 1;
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_probe_result_serialization() {
        let result = ProbeResult::response(200, Duration::from_millis(500));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["ok"], true);
        assert!(json["error_message"].is_null());
    }
}
