//! 调度时间工具
//!
//! 时钟与随机源注入、抖动间隔计算以及基于时区的截止规则

use crate::error::ConfigError;
use chrono::{DateTime, Local, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// 可注入的时钟函数
pub type ClockFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 可注入的随机源，返回 `[0, 1)` 内的值
pub type RandomFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// 每日截止小时：当地时间到达该小时后服务自行停止
pub const CUTOFF_HOUR: u32 = 2;

/// 首次之后的抖动间隔下限（分钟）
pub const JITTER_MIN_MINUTES: f64 = 10.0;

/// 首次之后的抖动间隔上限（分钟，不含）
pub const JITTER_MAX_MINUTES: f64 = 15.0;

/// 墙上时钟
pub fn system_clock() -> ClockFn {
    Arc::new(Utc::now)
}

/// 固定时钟，主要用于测试
pub fn fixed_clock(at: DateTime<Utc>) -> ClockFn {
    Arc::new(move || at)
}

/// 默认均匀随机源
pub fn default_random() -> RandomFn {
    Arc::new(rand::random::<f64>)
}

/// 计算 `[min, max)` 分钟内的随机间隔（毫秒）
///
/// # 参数
/// * `min_minutes` - 下限（分钟）
/// * `max_minutes_exclusive` - 上限（分钟，不含）
/// * `rnd` - 随机源
///
/// # 返回
/// * `u64` - 间隔毫秒数
pub fn compute_random_interval_ms(
    min_minutes: f64,
    max_minutes_exclusive: f64,
    rnd: &dyn Fn() -> f64,
) -> u64 {
    let min_ms = (min_minutes * 60_000.0).round().max(0.0) as u64;
    let max_ms = ((max_minutes_exclusive * 60_000.0).round().max(0.0) as u64).max(min_ms + 1);
    // NaN 会被 clamp 原样保留，这里按 0 处理
    let mut r = rnd();
    if r.is_nan() {
        r = 0.0;
    }
    let r = r.clamp(0.0, 0.999_999_999);
    let span = max_ms - min_ms;
    min_ms + (r * span as f64).floor() as u64
}

/// 解析IANA时区名称
pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>().map_err(|_| ConfigError::InvalidTimeZone {
        name: name.to_string(),
    })
}

/// 计算某时刻在指定时区（未指定则为本机时区）中的小时
pub fn hour_of_day(now: DateTime<Utc>, time_zone: Option<&Tz>) -> u32 {
    match time_zone {
        Some(tz) => now.with_timezone(tz).hour(),
        None => now.with_timezone(&Local).hour(),
    }
}

/// 判断是否已进入截止窗口
pub fn is_past_cutoff(now: DateTime<Utc>, time_zone: Option<&Tz>) -> bool {
    hour_of_day(now, time_zone) >= CUTOFF_HOUR
}
