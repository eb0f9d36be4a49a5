//! 消息模板模块
//!
//! 使用handlebars渲染告警消息

use crate::error::NotificationError;
use crate::health::HealthStats;
use handlebars::Handlebars;
use serde::Serialize;

const TEMPLATE_NAME: &str = "critical";

/// 模板上下文数据
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// 诊断信息
    pub message: String,
    /// 探测URL
    pub url: String,
    /// 连续失败次数
    pub consecutive_failures: u32,
    /// 失败次数
    pub failures: u64,
    /// 总探测次数
    pub total: u64,
    /// 最近错误
    pub last_error: Option<String>,
    /// 最近状态码
    pub last_status_code: Option<u16>,
    /// 最近耗时（毫秒）
    pub last_response_time_ms: Option<u64>,
    /// 渲染时间
    pub timestamp: String,
}

impl TemplateContext {
    /// 从统计快照构建上下文
    pub fn from_stats(message: &str, url: &str, stats: &HealthStats) -> Self {
        Self {
            message: message.to_string(),
            url: url.to_string(),
            consecutive_failures: stats.consecutive_failures,
            failures: stats.failures,
            total: stats.total,
            last_error: stats.last_error.clone(),
            last_status_code: stats.last_status_code,
            last_response_time_ms: stats.last_response_time_ms,
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// 告警消息模板
pub struct AlertTemplate {
    registry: Handlebars<'static>,
}

impl AlertTemplate {
    /// 编译模板
    ///
    /// # 参数
    /// * `template` - handlebars模板字符串
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 语法错误时返回 `TemplateError`
    pub fn new(template: &str) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        // 消息发往聊天平台，不做HTML转义
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))?;
        Ok(Self { registry })
    }

    /// 渲染模板
    pub fn render(&self, context: &TemplateContext) -> Result<String, NotificationError> {
        self.registry
            .render(TEMPLATE_NAME, context)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }

    /// 使用默认模板
    pub fn default_template() -> Result<Self, NotificationError> {
        Self::new(DEFAULT_ALERT_TEMPLATE)
    }
}

/// 默认的告警消息模板
pub const DEFAULT_ALERT_TEMPLATE: &str = r#"🚨 **Ping watchdog alert**
- **URL**: {{url}}
- **Reason**: {{message}}
- **Consecutive failures**: {{consecutive_failures}}
- **Failures / total**: {{failures}} / {{total}}
{{#if last_status_code}}
- **Last status**: {{last_status_code}}
{{/if}}
{{#if last_error}}
- **Last error**: {{last_error}}
{{/if}}
- **Time**: {{timestamp}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn failing_stats() -> HealthStats {
        let mut stats = HealthStats::new(Utc::now());
        stats.total = 5;
        stats.failures = 3;
        stats.successes = 2;
        stats.consecutive_failures = 3;
        stats.last_error = Some("Connection failed: connection refused".to_string());
        stats
    }

    #[test]
    fn test_default_template_render() {
        let context =
            TemplateContext::from_stats("consecutive failures", "https://example.com/", &failing_stats());
        let text = AlertTemplate::default_template().unwrap().render(&context).unwrap();

        assert!(text.contains("https://example.com/"));
        assert!(text.contains("**Consecutive failures**: 3"));
        assert!(text.contains("3 / 5"));
        assert!(text.contains("Connection failed: connection refused"));
        assert!(!text.contains("Last status"));
    }

    #[test]
    fn test_custom_template_does_not_escape() {
        let template = AlertTemplate::new("{{url}} <{{consecutive_failures}}>").unwrap();
        let context =
            TemplateContext::from_stats("x", "https://example.com/?a=1&b=2", &failing_stats());
        assert_eq!(
            template.render(&context).unwrap(),
            "https://example.com/?a=1&b=2 <3>"
        );
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let err = AlertTemplate::new("{{#if url}}unclosed").err().unwrap();
        assert!(matches!(err, NotificationError::TemplateError(_)));
    }
}
