//! 探测调度器模块
//!
//! 自调度的存活探测服务：无漂移重排、首次之后的抖动间隔、重叠保护、
//! 基于时区的每日截止、连续失败告警以及自动重启标记的持久化。

use crate::config::types::{validate_config, PingConfig};
use crate::error::{ConfigError, Result, StorageError};
use crate::health::checker::{HttpProber, Prober};
use crate::health::monitor::{is_alive, HealthMonitor};
use crate::health::result::{HealthStats, ProbeResult};
use crate::health::timing::{
    compute_random_interval_ms, default_random, is_past_cutoff, parse_time_zone, system_clock,
    ClockFn, RandomFn, JITTER_MAX_MINUTES, JITTER_MIN_MINUTES,
};
use crate::notification::Notifier;
use crate::storage::{MemoryStorage, Storage, PING_ENABLED_KEY, PING_ENABLED_VALUE};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};

/// 调度状态，只在持锁时修改
#[derive(Debug)]
struct SchedulerState {
    /// 是否运行中
    running: bool,
    /// 是否有调度探测尚未完成
    in_flight: bool,
    /// 下一次是否为启动后的第一次调度
    first_tick: bool,
    /// 计划中的下一次唤醒时间
    next_tick_at: Option<Instant>,
    /// 当前运行会话的取消令牌
    cancel: Option<CancellationToken>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            running: false,
            in_flight: false,
            first_tick: true,
            next_tick_at: None,
            cancel: None,
        }
    }
}

/// 单次调度的结果
#[derive(Debug, PartialEq, Eq)]
enum TickOutcome {
    /// 继续调度
    Continue,
    /// 会话结束
    Halt,
}

struct Inner {
    config: PingConfig,
    time_zone: Option<Tz>,
    prober: Arc<dyn Prober>,
    notifier: Option<Arc<dyn Notifier>>,
    storage: Arc<dyn Storage>,
    clock: ClockFn,
    random: RandomFn,
    monitor: RwLock<HealthMonitor>,
    state: Mutex<SchedulerState>,
}

/// 存活探测服务
///
/// 克隆得到的句柄共享同一份状态。
#[derive(Clone)]
pub struct PingService {
    inner: Arc<Inner>,
}

/// 探测服务构建器
pub struct PingServiceBuilder {
    config: PingConfig,
    prober: Option<Arc<dyn Prober>>,
    notifier: Option<Arc<dyn Notifier>>,
    storage: Option<Arc<dyn Storage>>,
    clock: Option<ClockFn>,
    random: Option<RandomFn>,
}

impl PingServiceBuilder {
    /// 注入HTTP探测器
    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// 注入告警发送器
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// 注入键值存储
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// 注入时钟
    pub fn clock(mut self, clock: ClockFn) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 注入随机源
    pub fn random(mut self, random: RandomFn) -> Self {
        self.random = Some(random);
        self
    }

    /// 构建服务
    ///
    /// # 返回
    /// * `Result<PingService>` - 配置无效时返回 `ConfigError`
    pub fn build(self) -> Result<PingService> {
        validate_config(&self.config).map_err(ConfigError::ValidationError)?;
        let time_zone = self
            .config
            .time_zone
            .as_deref()
            .map(parse_time_zone)
            .transpose()?;

        let prober = match self.prober {
            Some(prober) => prober,
            None => Arc::new(HttpProber::new()?),
        };
        let clock = self.clock.unwrap_or_else(system_clock);
        let start_time = clock();

        Ok(PingService {
            inner: Arc::new(Inner {
                config: self.config,
                time_zone,
                prober,
                notifier: self.notifier,
                storage: self
                    .storage
                    .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
                clock,
                random: self.random.unwrap_or_else(default_random),
                monitor: RwLock::new(HealthMonitor::new(start_time)),
                state: Mutex::new(SchedulerState::default()),
            }),
        })
    }
}

impl PingService {
    /// 创建新的探测服务
    ///
    /// # 参数
    /// * `config` - 探测配置
    /// * `notifier` - 告警发送器（可选）
    ///
    /// # 返回
    /// * `Result<Self>` - 服务实例
    pub fn new(config: PingConfig, notifier: Option<Arc<dyn Notifier>>) -> Result<Self> {
        let mut builder = Self::builder(config);
        if let Some(notifier) = notifier {
            builder = builder.notifier(notifier);
        }
        builder.build()
    }

    /// 创建构建器
    pub fn builder(config: PingConfig) -> PingServiceBuilder {
        PingServiceBuilder {
            config,
            prober: None,
            notifier: None,
            storage: None,
            clock: None,
            random: None,
        }
    }

    /// 启动调度
    ///
    /// 已在运行时不做任何事。启用持久化时先写入自动重启标记，写入失败则保持停止状态并返回错误。
    pub async fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.running {
            return Ok(());
        }

        if self.inner.config.persist {
            self.inner
                .storage
                .set_item(PING_ENABLED_KEY, PING_ENABLED_VALUE)?;
        }

        let token = CancellationToken::new();
        state.running = true;
        state.first_tick = true;
        state.next_tick_at = Some(Instant::now());
        state.cancel = Some(token.clone());
        drop(state);

        if self.inner.log_enabled(Level::INFO) {
            info!(
                url = %self.inner.config.url,
                interval_ms = self.inner.config.interval_ms,
                timeout_ms = self.inner.config.timeout_ms,
                "ping service started"
            );
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(token).await });
        Ok(())
    }

    /// 停止调度
    ///
    /// 只阻止后续调度，不中断正在进行的探测。启用持久化时在状态切换之后删除标记，删除失败会返回错误。
    pub async fn stop(&self) -> Result<()> {
        self.inner.halt().await?;
        Ok(())
    }

    /// 获取统计快照
    pub async fn stats(&self) -> HealthStats {
        self.inner.monitor.read().await.snapshot()
    }

    /// 立即执行一次探测并计入统计
    ///
    /// 不经过重叠保护，与正在运行的调度并发调用时可能与调度探测交错。
    pub async fn ping_once(&self) -> ProbeResult {
        let result = self.inner.probe().await;
        self.inner.monitor.write().await.record(&result);
        result
    }

    /// 是否运行中
    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.running
    }

    /// 探测配置
    pub fn config(&self) -> &PingConfig {
        &self.inner.config
    }
}

impl Inner {
    fn log_enabled(&self, level: Level) -> bool {
        self.config.log_level.allows(level)
    }

    async fn probe(&self) -> ProbeResult {
        self.prober
            .probe(&self.config.url, Duration::from_millis(self.config.timeout_ms))
            .await
    }

    /// 调度循环，每个运行会话一个
    async fn run(self: Arc<Self>, token: CancellationToken) {
        loop {
            let wake_at = {
                let state = self.state.lock().await;
                match state.next_tick_at {
                    Some(at) => at,
                    None => break,
                }
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep_until(wake_at) => {}
            }

            if self.tick(&token).await == TickOutcome::Halt {
                break;
            }
        }
        debug!("调度循环已退出");
    }

    async fn tick(&self, token: &CancellationToken) -> TickOutcome {
        if token.is_cancelled() {
            return TickOutcome::Halt;
        }

        // 截止检查在任何网络操作之前
        if is_past_cutoff((self.clock)(), self.time_zone.as_ref()) {
            if self.log_enabled(Level::INFO) {
                info!("已进入每日截止窗口，停止探测服务");
            }
            if let Err(e) = self.halt_session(token).await {
                if self.log_enabled(Level::ERROR) {
                    error!("截止停止时清除自动重启标记失败: {}", e);
                }
            }
            return TickOutcome::Halt;
        }

        // 先算好下一次唤醒时间，探测耗时不累积漂移
        let overlapped = {
            let mut state = self.state.lock().await;
            // stop() 持锁取消令牌，这里再检查一次
            if token.is_cancelled() {
                return TickOutcome::Halt;
            }
            let planned = state.next_tick_at.unwrap_or_else(Instant::now);
            let next_ms = if state.first_tick {
                self.config.interval_ms
            } else {
                compute_random_interval_ms(JITTER_MIN_MINUTES, JITTER_MAX_MINUTES, &*self.random)
            };
            state.first_tick = false;
            state.next_tick_at = Some(planned + Duration::from_millis(next_ms));

            if state.in_flight {
                true
            } else {
                state.in_flight = true;
                false
            }
        };

        if overlapped {
            self.monitor.write().await.increment_skipped_overlap();
            if self.log_enabled(Level::DEBUG) {
                debug!("skipping tick due to overlap");
            }
            return TickOutcome::Continue;
        }

        let started_at = (self.clock)();
        let result = self.probe().await;
        let stats = {
            let mut monitor = self.monitor.write().await;
            monitor.record(&result);
            monitor.snapshot()
        };
        self.state.lock().await.in_flight = false;

        self.log_result(&result, started_at);

        if stats.consecutive_failures >= self.config.critical_failure_threshold {
            self.escalate(&stats).await;
        }

        TickOutcome::Continue
    }

    fn log_result(&self, result: &ProbeResult, started_at: chrono::DateTime<chrono::Utc>) {
        let status = result
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "None".to_string());
        let err = result.error_message.as_deref().unwrap_or("None");

        if is_alive(result) {
            if self.log_enabled(Level::INFO) {
                info!(
                    ts = %started_at.to_rfc3339(),
                    status = %status,
                    ms = result.response_time_ms,
                    ok = result.ok,
                    err = %err,
                    "ping ok"
                );
            }
        } else if self.log_enabled(Level::ERROR) {
            error!(
                ts = %started_at.to_rfc3339(),
                status = %status,
                ms = result.response_time_ms,
                ok = result.ok,
                err = %err,
                "ping error"
            );
        }
    }

    /// 调用告警发送器，错误只记录不传播
    async fn escalate(&self, stats: &HealthStats) {
        let Some(notifier) = self.notifier.as_ref() else {
            return;
        };

        let message = format!(
            "consecutive failures: {} (threshold {}) for {}",
            stats.consecutive_failures, self.config.critical_failure_threshold, self.config.url
        );
        if self.log_enabled(Level::DEBUG) {
            debug!("发送连续失败告警: {}", message);
        }
        if let Err(e) = notifier.notify_critical(&message, stats).await {
            if self.log_enabled(Level::WARN) {
                warn!("发送连续失败告警失败: {}", e);
            }
        }
    }

    /// 在持锁状态下切换到停止
    fn stop_locked(state: &mut SchedulerState) {
        state.running = false;
        state.next_tick_at = None;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
    }

    /// 停止当前会话（如果有）
    async fn halt(&self) -> std::result::Result<(), StorageError> {
        Self::stop_locked(&mut *self.state.lock().await);
        self.after_stop()
    }

    /// 只在令牌仍属于当前会话时停止，避免旧循环停掉新会话
    async fn halt_session(&self, token: &CancellationToken) -> std::result::Result<(), StorageError> {
        {
            // stop() 持锁取消旧令牌，同一把锁下未取消的令牌就是当前会话的
            let mut state = self.state.lock().await;
            if token.is_cancelled() {
                return Ok(());
            }
            Self::stop_locked(&mut state);
        }
        self.after_stop()
    }

    fn after_stop(&self) -> std::result::Result<(), StorageError> {
        if self.log_enabled(Level::INFO) {
            info!("ping service stopped");
        }
        self.clear_sentinel()
    }

    fn clear_sentinel(&self) -> std::result::Result<(), StorageError> {
        if self.config.persist {
            self.storage.remove_item(PING_ENABLED_KEY)?;
        }
        Ok(())
    }
}
