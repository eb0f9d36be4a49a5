//! 告警发送器模块
//!
//! 定义连续失败告警的trait和基础实现

use crate::health::HealthStats;
use anyhow::Result;
use async_trait::async_trait;

/// 告警发送器trait
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送严重告警
    ///
    /// # 参数
    /// * `message` - 诊断信息
    /// * `stats` - 当前统计快照
    ///
    /// # 返回
    /// * `Result<()>` - 发送结果，调用方会吞掉错误
    async fn notify_critical(&self, message: &str, stats: &HealthStats) -> Result<()>;
}
