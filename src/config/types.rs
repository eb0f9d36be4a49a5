//! 配置数据结构定义
//!
//! 定义探测服务的配置结构体和验证逻辑

use crate::health::timing::parse_time_zone;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 日志详细程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 不输出
    None,
    /// 常规输出
    #[default]
    Normal,
    /// 调试输出
    Debug,
}

impl LogLevel {
    /// 判断该详细程度是否允许输出指定级别的日志
    pub fn allows(&self, level: tracing::Level) -> bool {
        match self {
            LogLevel::None => false,
            LogLevel::Normal => level <= tracing::Level::INFO,
            LogLevel::Debug => level <= tracing::Level::DEBUG,
        }
    }

    /// 宽松解析，无法识别的值按 `Normal` 处理
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => LogLevel::None,
            "debug" => LogLevel::Debug,
            _ => LogLevel::Normal,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::None => write!(f, "none"),
            LogLevel::Normal => write!(f, "normal"),
            LogLevel::Debug => write!(f, "debug"),
        }
    }
}

/// 探测服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingConfig {
    /// 目标URL
    pub url: String,
    /// 基础间隔（毫秒），只用于启动后的第一次调度
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// 单次探测超时（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 日志详细程度
    #[serde(default)]
    pub log_level: LogLevel,
    /// 触发告警的连续失败次数
    #[serde(default = "default_critical_failure_threshold")]
    pub critical_failure_threshold: u32,
    /// IANA时区名称，未设置时使用本机时区
    #[serde(default)]
    pub time_zone: Option<String>,
    /// 是否持久化自动重启标记
    #[serde(default)]
    pub persist: bool,
    /// 持久化文件路径
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// 告警webhook配置
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
    /// Web端点配置
    #[serde(default)]
    pub web: Option<WebConfig>,
}

impl PingConfig {
    /// 使用默认值创建配置
    ///
    /// # 参数
    /// * `url` - 目标URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            log_level: LogLevel::default(),
            critical_failure_threshold: default_critical_failure_threshold(),
            time_zone: None,
            persist: false,
            storage_path: None,
            webhook: None,
            web: None,
        }
    }
}

/// webhook消息格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFormat {
    /// Discord webhook
    #[default]
    Discord,
    /// 飞书机器人
    Feishu,
    /// 通用JSON
    Json,
}

/// 告警webhook配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// webhook URL
    pub url: String,
    /// 消息格式
    #[serde(default)]
    pub format: WebhookFormat,
    /// 签名密钥（飞书签名校验）
    #[serde(default)]
    pub secret: Option<String>,
    /// 自定义handlebars消息模板
    #[serde(default)]
    pub template: Option<String>,
    /// 发送超时（秒）
    #[serde(default = "default_webhook_timeout")]
    pub timeout_seconds: u64,
}

/// Web端点配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    /// 是否启用
    #[serde(default)]
    pub enabled: bool,
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 端口
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

// 默认值函数
fn default_interval_ms() -> u64 {
    10 * 60_000
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_critical_failure_threshold() -> u32 {
    3
}
fn default_webhook_timeout() -> u64 {
    10
}
fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &PingConfig) -> Result<(), String> {
    if !is_http_url(&config.url) {
        return Err(format!("无效的探测URL: {}", config.url));
    }

    if config.interval_ms == 0 {
        return Err("探测间隔不能为0".to_string());
    }

    if config.timeout_ms == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if config.critical_failure_threshold == 0 {
        return Err("连续失败阈值必须为正整数".to_string());
    }

    if let Some(ref name) = config.time_zone {
        if let Err(e) = parse_time_zone(name) {
            return Err(e.to_string());
        }
    }

    if let Some(ref webhook) = config.webhook {
        if !is_http_url(&webhook.url) {
            return Err(format!("无效的webhook URL: {}", webhook.url));
        }
        if webhook.timeout_seconds == 0 {
            return Err("webhook超时时间不能为0".to_string());
        }
    }

    if let Some(ref web) = config.web {
        if web.enabled {
            if web.port == 0 {
                return Err("Web端口不能为0".to_string());
            }
            if web.bind_address.trim().is_empty() {
                return Err("Web绑定地址不能为空".to_string());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_gating() {
        use tracing::Level;
        assert!(!LogLevel::None.allows(Level::ERROR));
        assert!(LogLevel::Normal.allows(Level::ERROR));
        assert!(LogLevel::Normal.allows(Level::INFO));
        assert!(!LogLevel::Normal.allows(Level::DEBUG));
        assert!(LogLevel::Debug.allows(Level::DEBUG));
        assert!(!LogLevel::Debug.allows(Level::TRACE));
    }

    #[test]
    fn test_log_level_lenient_parse() {
        assert_eq!(LogLevel::parse_lenient("none"), LogLevel::None);
        assert_eq!(LogLevel::parse_lenient("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::parse_lenient("verbose"), LogLevel::Normal);
        assert_eq!(LogLevel::parse_lenient(""), LogLevel::Normal);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PingConfig::new("https://example.com/");
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.interval_ms, 600_000);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.critical_failure_threshold, 3);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = PingConfig::new("ftp://example.com");
        assert!(validate_config(&config).unwrap_err().contains("URL"));

        config.url = "http://example.com".to_string();
        config.critical_failure_threshold = 0;
        assert!(validate_config(&config).is_err());

        config.critical_failure_threshold = 1;
        config.time_zone = Some("Nowhere/City".to_string());
        assert!(validate_config(&config).unwrap_err().contains("Nowhere/City"));

        config.time_zone = Some("Europe/Berlin".to_string());
        config.web = Some(WebConfig {
            enabled: true,
            port: 0,
            ..Default::default()
        });
        assert!(validate_config(&config).is_err());

        config.web = None;
        config.timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: PingConfig = toml::from_str(
            r#"
            url = "https://example.com/"
            log_level = "debug"

            [webhook]
            url = "https://discord.com/api/webhooks/1/abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.interval_ms, 600_000);
        assert!(!config.persist);
        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.format, WebhookFormat::Discord);
        assert_eq!(webhook.timeout_seconds, 10);
    }
}
