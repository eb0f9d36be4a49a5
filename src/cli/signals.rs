//! 信号处理模块
//!
//! 收到 SIGINT/SIGTERM（非Unix系统为 Ctrl+C）时取消关闭令牌

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 后台监听退出信号
pub fn spawn_signal_listener(shutdown: CancellationToken) -> Result<()> {
    #[cfg(unix)]
    {
        use anyhow::Context;
        use futures::stream::StreamExt;

        let mut signals = Signals::new([SIGINT, SIGTERM]).context("注册信号处理器失败")?;
        let handle = signals.handle();
        tokio::spawn(async move {
            if let Some(signal) = signals.next().await {
                match signal {
                    SIGINT => info!("接收到 SIGINT 信号，开始优雅关闭..."),
                    SIGTERM => info!("接收到 SIGTERM 信号，开始优雅关闭..."),
                    other => info!("接收到信号 {other}，开始优雅关闭..."),
                }
                shutdown.cancel();
            }
            handle.close();
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("接收到 Ctrl+C，开始优雅关闭...");
                    shutdown.cancel();
                }
                Err(e) => tracing::error!("监听 Ctrl+C 失败: {e}"),
            }
        });
    }

    Ok(())
}
