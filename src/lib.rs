//! Ping Watchdog - 自调度HTTP存活探测工具
//!
//! 周期性地对配置的端点发起带超时的HTTP探测，支持：
//! - 无漂移调度与首次之后的随机抖动间隔
//! - 重叠保护与基于时区的每日截止
//! - 连续失败告警（Discord / 飞书 / JSON webhook）
//! - 自动重启标记持久化
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod storage;
pub mod web;

// 重新导出主要类型
pub use config::{LogLevel, PingConfig};
pub use error::{Result, WatchdogError};
pub use health::{HealthStats, PingService, PingServiceBuilder, ProbeResult};
pub use notification::Notifier;
pub use storage::{should_auto_restart, Storage};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
