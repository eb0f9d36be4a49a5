//! 健康检测模块
//!
//! 提供HTTP探测、统计聚合和探测调度功能

pub mod checker;
pub mod monitor;
pub mod result;
pub mod scheduler;
pub mod timing;

// 重新导出主要类型
pub use checker::{HttpProber, Prober};
pub use monitor::{is_alive, HealthMonitor};
pub use result::{HealthStats, ProbeResult};
pub use scheduler::{PingService, PingServiceBuilder};
