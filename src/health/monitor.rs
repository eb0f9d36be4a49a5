//! 健康统计聚合器
//!
//! 把每次探测结果折叠进滚动计数器

use crate::health::result::{HealthStats, ProbeResult};
use chrono::{DateTime, Utc};

/// 判断探测结果是否算作存活
///
/// 只要收到 `[200, 500)` 范围内的响应就算存活，404 也是"活着"，5xx 则不健康。
pub fn is_alive(result: &ProbeResult) -> bool {
    result.ok && matches!(result.status_code, Some(code) if (200..500).contains(&code))
}

/// 健康监视器
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    stats: HealthStats,
}

impl HealthMonitor {
    /// 创建新的监视器
    ///
    /// # 参数
    /// * `start_time` - 统计起始时间
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            stats: HealthStats::new(start_time),
        }
    }

    /// 记录一次探测结果
    pub fn record(&mut self, result: &ProbeResult) {
        let stats = &mut self.stats;
        stats.total += 1;
        stats.last_response_time_ms = Some(result.response_time_ms);
        stats.last_status_code = result.status_code;

        if is_alive(result) {
            stats.successes += 1;
            stats.consecutive_failures = 0;
            stats.last_error = None;
        } else {
            stats.failures += 1;
            stats.consecutive_failures += 1;
            stats.last_error = Some(
                result
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("status {}", result.status_code.unwrap_or(0))),
            );
        }
    }

    /// 记录一次因重叠而跳过的调度
    pub fn increment_skipped_overlap(&mut self) {
        self.stats.skipped_overlaps += 1;
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> HealthStats {
        self.stats.clone()
    }
}
