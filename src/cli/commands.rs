//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::cli::signals::spawn_signal_listener;
use crate::config::{env_keys, validate_config, ConfigLoader, PingConfig, TomlConfigLoader};
use crate::error::ConfigError;
use crate::health::{is_alive, PingService};
use crate::logging::LogConfig;
use crate::notification::{Notifier, WebhookNotifier};
use crate::storage::{should_auto_restart, FileStorage, MemoryStorage, Storage};
use crate::web::serve_web;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    ///
    /// # 返回
    /// * `Result<i32>` - 进程退出码
    async fn execute(&self, args: &Args, config: PingConfig) -> Result<i32>;
}

/// 分发CLI命令
///
/// `config` 由 [`load_config`] 预先加载，日志系统按它初始化后再分发。
pub async fn execute_command(args: &Args, config: PingConfig) -> Result<i32> {
    match &args.command {
        Commands::Run => RunCommand.execute(args, config).await,
        Commands::Check { .. } => CheckCommand.execute(args, config).await,
        Commands::ShouldRestart => ShouldRestartCommand.execute(args, config).await,
        Commands::Validate => ValidateCommand.execute(args, config).await,
    }
}

/// 日志配置
///
/// 级别取已加载配置中的值（已包含 `--log-level` 覆盖），配置加载失败时只看命令行。
pub fn build_log_config(args: &Args, config: Option<&PingConfig>) -> LogConfig {
    let level = match config {
        Some(config) => config.log_level,
        None => args
            .log_level
            .map(crate::config::LogLevel::from)
            .unwrap_or_default(),
    };
    LogConfig {
        file_path: args.log_file.clone(),
        json_format: args.json_logs,
        ..LogConfig::with_level(level)
    }
}

/// 加载配置：优先使用配置文件，否则读取环境变量
pub async fn load_config(args: &Args) -> Result<PingConfig> {
    let mut config = match &args.config {
        Some(path) => TomlConfigLoader::default()
            .load_from_file(path)
            .await
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
        None => {
            let config = PingConfig::from_env().ok_or_else(|| {
                anyhow!("未指定 --config，且未设置 {} 环境变量", env_keys::URL)
            })?;
            validate_config(&config).map_err(ConfigError::ValidationError)?;
            config
        }
    };

    if let Some(level) = args.log_level {
        config.log_level = level.into();
    }
    Ok(config)
}

/// 持久化文件路径
pub fn storage_path(config: &PingConfig) -> PathBuf {
    config
        .storage_path
        .clone()
        .unwrap_or_else(FileStorage::default_path)
}

/// 根据配置选择存储
pub fn build_storage(config: &PingConfig) -> Arc<dyn Storage> {
    if config.persist {
        Arc::new(FileStorage::new(storage_path(config)))
    } else {
        Arc::new(MemoryStorage::new())
    }
}

/// 根据配置创建告警发送器
pub fn build_notifier(config: &PingConfig) -> Result<Option<Arc<dyn Notifier>>> {
    match &config.webhook {
        Some(webhook) => {
            let notifier = WebhookNotifier::new(webhook.clone(), config.url.clone())
                .context("创建webhook告警发送器失败")?;
            Ok(Some(Arc::new(notifier)))
        }
        None => Ok(None),
    }
}

/// 运行命令
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, _args: &Args, config: PingConfig) -> Result<i32> {
        let mut builder = PingService::builder(config.clone()).storage(build_storage(&config));
        if let Some(notifier) = build_notifier(&config)? {
            builder = builder.notifier(notifier);
        }
        let service = builder.build()?;

        let shutdown = CancellationToken::new();
        spawn_signal_listener(shutdown.clone())?;

        let web_task = config.web.clone().filter(|web| web.enabled).map(|web| {
            let service = service.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { serve_web(&web, service, shutdown).await })
        });

        service.start().await.context("启动探测服务失败")?;

        // 等待退出信号，或服务在截止窗口自行停止
        let mut poll = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = poll.tick() => {
                    if !service.is_running().await {
                        info!("探测服务已自行停止");
                        break;
                    }
                }
            }
        }

        if service.is_running().await {
            service.stop().await.context("停止探测服务失败")?;
        }
        shutdown.cancel();

        if let Some(task) = web_task {
            match task.await {
                Ok(result) => result?,
                Err(e) => error!("Web服务器任务异常退出: {}", e),
            }
        }

        Ok(0)
    }
}

/// 单次探测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args, config: PingConfig) -> Result<i32> {
        let format = match &args.command {
            Commands::Check { format } => *format,
            _ => OutputFormat::Text,
        };

        let service = PingService::builder(config).build()?;
        let result = service.ping_once().await;
        let stats = service.stats().await;
        let alive = is_alive(&result);

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "url": service.config().url,
                    "alive": alive,
                    "result": result,
                    "stats": stats,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                let status = result
                    .status_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("URL: {}", service.config().url);
                println!("存活: {}", if alive { "是" } else { "否" });
                println!("状态码: {status}");
                println!("耗时: {}ms", result.response_time_ms);
                if let Some(err) = &result.error_message {
                    println!("错误: {err}");
                }
            }
        }

        Ok(if alive { 0 } else { 1 })
    }
}

/// 自动重启标记查询命令
pub struct ShouldRestartCommand;

#[async_trait]
impl Command for ShouldRestartCommand {
    async fn execute(&self, _args: &Args, config: PingConfig) -> Result<i32> {
        let storage = FileStorage::new(storage_path(&config));
        let restart = should_auto_restart(&storage);
        println!("{restart}");
        Ok(if restart { 0 } else { 1 })
    }
}

/// 配置验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, _args: &Args, config: PingConfig) -> Result<i32> {
        println!("✅ 配置有效");
        println!("URL: {}", config.url);
        println!("首次间隔: {}ms", config.interval_ms);
        println!("超时: {}ms", config.timeout_ms);
        println!("连续失败阈值: {}", config.critical_failure_threshold);
        println!(
            "时区: {}",
            config.time_zone.as_deref().unwrap_or("本机时区")
        );
        println!("日志级别: {}", config.log_level);
        if config.persist {
            println!("持久化文件: {}", storage_path(&config).display());
        }
        if let Some(webhook) = &config.webhook {
            println!("告警webhook: {} ({:?})", webhook.url, webhook.format);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PING_ENABLED_KEY, PING_ENABLED_VALUE};
    use clap::Parser;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn args(config: &NamedTempFile, command: &[&str]) -> Args {
        let path = config.path().to_str().unwrap();
        let mut argv = vec!["ping-watchdog", "--config", path];
        argv.extend_from_slice(command);
        Args::try_parse_from(argv).unwrap()
    }

    async fn run(args: &Args) -> Result<i32> {
        let config = load_config(args).await?;
        execute_command(args, config).await
    }

    #[tokio::test]
    async fn test_check_alive_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(404)
            .create_async()
            .await;

        let file = write_config(&format!("url = \"{}/\"\nlog_level = \"none\"\n", server.url()));
        let code = run(&args(&file, &["check", "--format", "json"]))
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_check_broken_endpoint_exits_nonzero() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(502)
            .create_async()
            .await;

        let file = write_config(&format!("url = \"{}/\"\nlog_level = \"none\"\n", server.url()));
        let code = run(&args(&file, &["check"])).await.unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_should_restart_reads_sentinel() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state.json");
        let file = write_config(&format!(
            "url = \"https://example.com/\"\npersist = true\nstorage_path = \"{}\"\n",
            state.display()
        ));

        let code = run(&args(&file, &["should-restart"])).await.unwrap();
        assert_eq!(code, 1);

        FileStorage::new(&state)
            .set_item(PING_ENABLED_KEY, PING_ENABLED_VALUE)
            .unwrap();
        let code = run(&args(&file, &["should-restart"])).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_validate_reports_invalid_config() {
        let good = write_config("url = \"https://example.com/\"\ntime_zone = \"Asia/Shanghai\"\n");
        assert_eq!(run(&args(&good, &["validate"])).await.unwrap(), 0);

        let bad = write_config("url = \"https://example.com/\"\ntime_zone = \"Mars/Olympus\"\n");
        assert!(run(&args(&bad, &["validate"])).await.is_err());
    }

    #[tokio::test]
    async fn test_log_level_flag_overrides_config() {
        let file = write_config("url = \"https://example.com/\"\nlog_level = \"debug\"\n");
        let path = file.path().to_str().unwrap();
        let args =
            Args::try_parse_from(["ping-watchdog", "--config", path, "-l", "none", "validate"])
                .unwrap();

        let config = load_config(&args).await.unwrap();
        assert_eq!(config.log_level, crate::config::LogLevel::None);
        assert_eq!(
            build_log_config(&args, Some(&config)).level,
            crate::config::LogLevel::None
        );
    }

    #[tokio::test]
    async fn test_log_config_follows_config_file_level() {
        let file = write_config("url = \"https://example.com/\"\nlog_level = \"debug\"\n");
        let path = file.path().to_str().unwrap();
        let args = Args::try_parse_from([
            "ping-watchdog",
            "--config",
            path,
            "--log-file",
            "/tmp/ping.log",
            "validate",
        ])
        .unwrap();

        let config = load_config(&args).await.unwrap();
        let log_config = build_log_config(&args, Some(&config));
        assert_eq!(log_config.level, crate::config::LogLevel::Debug);
        assert_eq!(log_config.file_path, Some(PathBuf::from("/tmp/ping.log")));
        assert!(!log_config.json_format);
    }

    #[test]
    fn test_log_config_without_loaded_config_uses_flag() {
        let args = Args::try_parse_from(["ping-watchdog", "-l", "debug", "validate"]).unwrap();
        assert_eq!(
            build_log_config(&args, None).level,
            crate::config::LogLevel::Debug
        );

        let args = Args::try_parse_from(["ping-watchdog", "validate"]).unwrap();
        assert_eq!(
            build_log_config(&args, None).level,
            crate::config::LogLevel::Normal
        );
    }

    #[test]
    fn test_storage_selection_follows_persist() {
        let dir = TempDir::new().unwrap();
        let mut config = PingConfig::new("https://example.com/");
        config.storage_path = Some(dir.path().join("state.json"));

        build_storage(&config)
            .set_item(PING_ENABLED_KEY, PING_ENABLED_VALUE)
            .unwrap();
        assert!(!dir.path().join("state.json").exists());

        config.persist = true;
        build_storage(&config)
            .set_item(PING_ENABLED_KEY, PING_ENABLED_VALUE)
            .unwrap();
        assert!(dir.path().join("state.json").exists());
    }

    #[test]
    fn test_notifier_only_with_webhook() {
        let mut config = PingConfig::new("https://example.com/");
        assert!(build_notifier(&config).unwrap().is_none());

        config.webhook = Some(crate::config::WebhookConfig {
            url: "https://hooks.example.com/x".to_string(),
            format: crate::config::WebhookFormat::Json,
            secret: None,
            template: None,
            timeout_seconds: 5,
        });
        assert!(build_notifier(&config).unwrap().is_some());
    }
}
