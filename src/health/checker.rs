//! HTTP探测器实现
//!
//! 发起一次带硬超时的GET请求，并把所有传输层结果转换为数据

use crate::error::Result;
use crate::health::result::ProbeResult;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as _;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 探测器trait，HTTP传输的注入点
#[async_trait]
pub trait Prober: Send + Sync {
    /// 执行一次探测
    ///
    /// # 参数
    /// * `url` - 目标URL
    /// * `timeout_duration` - 超时时间
    ///
    /// # 返回
    /// * `ProbeResult` - 探测结果，失败也以数据形式返回
    async fn probe(&self, url: &str, timeout_duration: Duration) -> ProbeResult;
}

/// 基于reqwest的HTTP探测器
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("创建HTTP客户端失败")?;
        Ok(Self { client })
    }

    /// 发送请求并读完响应体，返回状态码
    async fn fetch(&self, url: &str) -> std::result::Result<u16, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        // 响应体只需读完，不关心内容
        response.bytes().await?;
        Ok(status_code)
    }

    /// 格式化请求错误信息
    fn format_request_error(error: &reqwest::Error) -> String {
        let kind = if error.is_timeout() {
            "Request timeout"
        } else if error.is_connect() {
            "Connection failed"
        } else if error.is_builder() {
            "Invalid request"
        } else if error.is_body() || error.is_decode() {
            "Response body error"
        } else {
            "Request failed"
        };

        // reqwest 的顶层信息较笼统，附上最底层的原因
        let mut source = error.source();
        let mut root = None;
        while let Some(cause) = source {
            root = Some(cause.to_string());
            source = cause.source();
        }

        match root {
            Some(cause) => format!("{kind}: {cause}"),
            None => format!("{kind}: {error}"),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout_duration: Duration) -> ProbeResult {
        let start_time = Instant::now();

        // 超时后 fetch future 被丢弃，底层连接随之关闭
        let outcome = timeout(timeout_duration, self.fetch(url)).await;
        let elapsed = start_time.elapsed();

        match outcome {
            Ok(Ok(status_code)) => ProbeResult::response(status_code, elapsed),
            Ok(Err(e)) => ProbeResult::failure(Self::format_request_error(&e), elapsed),
            Err(_) => ProbeResult::failure(
                format!(
                    "Request timeout after {}ms",
                    timeout_duration.as_millis()
                ),
                elapsed,
            ),
        }
    }
}
