//! 日志系统模块
//!
//! 提供结构化日志配置和一次性初始化

use crate::config::LogLevel;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志文件路径（可选，设置后不输出到控制台）
    pub file_path: Option<PathBuf>,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Normal,
            file_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 按日志级别创建配置
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

/// 日志级别到 tracing 过滤指令的映射
pub fn level_directive(level: LogLevel) -> Directive {
    match level {
        LogLevel::None => Directive::from(tracing::level_filters::LevelFilter::OFF),
        LogLevel::Normal => Directive::from(tracing::Level::INFO),
        LogLevel::Debug => Directive::from(tracing::Level::DEBUG),
    }
}

fn lock_state() -> std::sync::MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 初始化日志系统
///
/// 重复调用时保留第一次安装的订阅器，直接返回成功。
///
/// # 参数
/// * `config` - 日志配置
///
/// # 返回
/// * `anyhow::Result<()>` - 初始化结果
pub fn setup_logging(config: &LogConfig) -> anyhow::Result<()> {
    let mut state = lock_state();
    if state.initialized {
        return Ok(());
    }

    init_tracing_subscriber(config)?;
    state.initialized = true;
    Ok(())
}

fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive(level_directive(config.level));

    let result = if let Some(file_path) = &config.file_path {
        let file = std::fs::File::create(file_path)
            .with_context(|| format!("创建日志文件失败: {}", file_path.display()))?;
        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_ansi(false);
        let file_layer = if config.json_format {
            file_layer.json().boxed()
        } else {
            file_layer.boxed()
        };
        registry().with(env_filter).with(file_layer).try_init()
    } else {
        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_target(false)
                .boxed()
        };
        registry().with(env_filter).with(fmt_layer).try_init()
    };

    match result {
        Ok(()) => {
            tracing::debug!("日志配置: {:?}", config);
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            // 测试中其他订阅器可能已先安装
            if error_msg.contains("a global default trace dispatcher has already been set")
                || error_msg.contains("already been initialized")
            {
                Ok(())
            } else {
                Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_directive(LogLevel::None).to_string(), "off");
        assert_eq!(level_directive(LogLevel::Normal).to_string(), "info");
        assert_eq!(level_directive(LogLevel::Debug).to_string(), "debug");
    }

    #[test]
    #[serial]
    fn test_setup_is_idempotent() {
        let config = LogConfig::with_level(LogLevel::Debug);
        assert!(setup_logging(&config).is_ok());
        assert!(lock_state().initialized);

        // 第二次调用保留已安装的订阅器
        let other = LogConfig {
            json_format: true,
            ..LogConfig::default()
        };
        assert!(setup_logging(&other).is_ok());
        assert!(lock_state().initialized);
    }
}
