//! 配置加载器实现
//!
//! 提供环境变量配置、TOML配置文件解析和环境变量替换功能

use crate::config::types::{validate_config, LogLevel, PingConfig};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 环境变量名
pub mod env_keys {
    pub const URL: &str = "PING_URL";
    pub const INTERVAL_MINUTES: &str = "PING_INTERVAL_MINUTES";
    pub const TIMEOUT_SECONDS: &str = "PING_TIMEOUT_SECONDS";
    pub const LOG_LEVEL: &str = "PING_LOG_LEVEL";
    pub const CRITICAL_FAILURES: &str = "PING_CRITICAL_FAILURES";
    pub const TIMEZONE: &str = "PING_TIMEZONE";
    pub const PERSIST: &str = "PING_PERSIST";
    pub const STORAGE_PATH: &str = "PING_STORAGE_PATH";
}

const DEFAULT_INTERVAL_MINUTES: f64 = 10.0;
const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;
const DEFAULT_CRITICAL_FAILURES: i64 = 3;

impl PingConfig {
    /// 从进程环境变量构建配置
    ///
    /// # 返回
    /// * `Option<PingConfig>` - 未设置 `PING_URL` 时返回 `None`
    pub fn from_env() -> Option<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// 使用自定义查找函数构建配置
    ///
    /// # 参数
    /// * `lookup` - 环境变量查找函数
    pub fn from_env_with<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(env_keys::URL).filter(|url| !url.trim().is_empty())?;

        let interval_minutes =
            parse_number(&lookup, env_keys::INTERVAL_MINUTES, DEFAULT_INTERVAL_MINUTES);
        let timeout_seconds =
            parse_number(&lookup, env_keys::TIMEOUT_SECONDS, DEFAULT_TIMEOUT_SECONDS);
        let threshold =
            parse_number(&lookup, env_keys::CRITICAL_FAILURES, DEFAULT_CRITICAL_FAILURES);
        let log_level = lookup(env_keys::LOG_LEVEL)
            .map(|value| LogLevel::parse_lenient(&value))
            .unwrap_or_default();

        let mut config = PingConfig::new(url);
        config.interval_ms = (interval_minutes * 60_000.0).round().max(1.0) as u64;
        config.timeout_ms = (timeout_seconds * 1_000.0).round().max(1.0) as u64;
        config.log_level = log_level;
        config.critical_failure_threshold = threshold.clamp(1, u32::MAX as i64) as u32;
        config.time_zone = lookup(env_keys::TIMEZONE).filter(|tz| !tz.trim().is_empty());
        config.persist = lookup(env_keys::PERSIST).as_deref() == Some("true");
        config.storage_path = lookup(env_keys::STORAGE_PATH)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Some(config)
    }
}

/// 解析数值型环境变量，失败时回退到默认值
fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("环境变量 {} 的值无效: {}，使用默认值", key, raw);
                default
            }
        },
        None => default,
    }
}

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    async fn load_from_file(&self, path: &Path) -> Result<PingConfig>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<PingConfig>;

    /// 验证配置
    fn validate(&self, config: &PingConfig) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式编译失败: {e}")))?;

        let mut result = String::with_capacity(content.len());
        let mut last_end = 0;
        for captures in env_var_regex.captures_iter(content) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let value = std::env::var(name.as_str()).map_err(|_| ConfigError::EnvVarError {
                var: name.as_str().to_string(),
            })?;
            result.push_str(&content[last_end..whole.start()]);
            result.push_str(&value);
            last_end = whole.end();
        }
        result.push_str(&content[last_end..]);

        Ok(result)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file(&self, path: &Path) -> Result<PingConfig> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path).await?;
        self.load_from_string(&content).await
    }

    async fn load_from_string(&self, content: &str) -> Result<PingConfig> {
        let content = self.substitute_env_vars(content)?;
        let config: PingConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        self.validate(&config)?;
        Ok(config)
    }

    fn validate(&self, config: &PingConfig) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}
