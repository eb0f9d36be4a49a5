//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ping Watchdog - 自调度HTTP存活探测
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ping-watchdog",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径，未指定时从环境变量读取配置
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "PING_WATCHDOG_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，覆盖配置中的值
    #[arg(short, long, value_enum, help = "日志级别")]
    pub log_level: Option<LogLevel>,

    /// 以JSON格式输出日志
    #[arg(long, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// 日志文件路径，设置后日志写入文件而不是控制台
    #[arg(long, value_name = "FILE", help = "日志文件路径")]
    pub log_file: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 静默
    None,
    /// 普通
    Normal,
    /// 调试
    Debug,
}

impl From<LogLevel> for config::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::None => config::LogLevel::None,
            LogLevel::Normal => config::LogLevel::Normal,
            LogLevel::Debug => config::LogLevel::Debug,
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动探测服务，直到收到退出信号或进入截止窗口
    Run,

    /// 执行一次探测
    Check {
        /// 输出格式
        #[arg(long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 查询自动重启标记，已设置时退出码为0
    ShouldRestart,

    /// 验证配置
    Validate,
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
