//! Webhook告警发送器模块
//!
//! 将连续失败告警推送到 Discord / 飞书 / 通用JSON webhook

use crate::config::types::{WebhookConfig, WebhookFormat};
use crate::error::NotificationError;
use crate::health::HealthStats;
use crate::notification::sender::Notifier;
use crate::notification::template::{AlertTemplate, TemplateContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

/// Webhook告警发送器
pub struct WebhookNotifier {
    /// HTTP客户端
    client: Client,
    /// webhook配置
    config: WebhookConfig,
    /// 被探测的URL，写入消息正文
    probe_url: String,
    /// 消息模板
    template: AlertTemplate,
}

impl WebhookNotifier {
    /// 创建新的webhook发送器
    ///
    /// # 参数
    /// * `config` - webhook配置
    /// * `probe_url` - 被探测的URL
    ///
    /// # 返回
    /// * `Result<Self>` - 发送器实例
    pub fn new(config: WebhookConfig, probe_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("创建HTTP客户端失败")?;

        let template = match config.template.as_deref() {
            Some(custom) => AlertTemplate::new(custom)?,
            None => AlertTemplate::default_template()?,
        };

        Ok(Self {
            client,
            config,
            probe_url: probe_url.into(),
            template,
        })
    }

    /// 构建消息体
    fn build_message_body(&self, message: &str, text: &str, stats: &HealthStats) -> Result<Value> {
        let body = match self.config.format {
            WebhookFormat::Discord => json!({ "content": text }),
            WebhookFormat::Feishu => {
                let mut body = json!({
                    "msg_type": "interactive",
                    "card": {
                        "elements": [
                            {
                                "tag": "div",
                                "text": {
                                    "content": text,
                                    "tag": "lark_md"
                                }
                            }
                        ],
                        "header": {
                            "title": {
                                "content": "🚨 Ping watchdog alert",
                                "tag": "plain_text"
                            },
                            "template": "red"
                        }
                    }
                });
                if let Some(secret) = self.config.secret.as_deref() {
                    let timestamp = chrono::Utc::now().timestamp();
                    body["timestamp"] = json!(timestamp.to_string());
                    body["sign"] = json!(feishu_sign(timestamp, secret)?);
                }
                body
            }
            WebhookFormat::Json => json!({
                "message": message,
                "text": text,
                "stats": stats,
            }),
        };
        Ok(body)
    }

    /// 发送消息到webhook
    async fn send_to_webhook(&self, body: &Value) -> Result<()> {
        debug!("发送告警到webhook: {}", self.config.url);

        let response = self
            .client
            .post(&self.config.url)
            .json(body)
            .send()
            .await
            .context("发送webhook消息失败")?;

        if response.status().is_success() {
            info!("webhook告警发送成功");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("webhook告警发送失败: {} - {}", status, text);
            Err(NotificationError::SendError(format!("webhook返回 {status}")).into())
        }
    }
}

/// 计算飞书机器人签名
///
/// 以 `"{timestamp}\n{secret}"` 为密钥对空消息做 HMAC-SHA256，再做base64编码。
pub fn feishu_sign(timestamp: i64, secret: &str) -> Result<String> {
    let key = format!("{timestamp}\n{secret}");
    let mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| NotificationError::ConfigError(format!("签名密钥无效: {e}")))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_critical(&self, message: &str, stats: &HealthStats) -> Result<()> {
        let context = TemplateContext::from_stats(message, &self.probe_url, stats);
        let text = self.template.render(&context)?;
        let body = self.build_message_body(message, &text, stats)?;
        self.send_to_webhook(&body).await
    }
}
