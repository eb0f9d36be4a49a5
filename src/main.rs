//! Ping Watchdog 主程序入口

use anyhow::{Context, Result};
use ping_watchdog::cli::{build_log_config, execute_command, load_config, Args};
use ping_watchdog::logging::setup_logging;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse_args();

    // 先加载配置，日志级别以配置为准
    let config = load_config(&args).await;

    // 初始化日志系统
    let log_config = build_log_config(&args, config.as_ref().ok());
    setup_logging(&log_config).context("初始化日志系统失败")?;

    debug!("Ping Watchdog v{} 启动", ping_watchdog::VERSION);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("加载配置失败: {:#}", e);
            eprintln!("错误: {e:#}");
            std::process::exit(1);
        }
    };

    // 执行命令
    match execute_command(&args, config).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("命令执行失败: {:#}", e);
            eprintln!("错误: {e:#}");
            std::process::exit(1);
        }
    }
}
