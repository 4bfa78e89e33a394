//! 日志初始化
//!
//! 配置tracing日志框架。`RUST_LOG` 环境变量优先于配置文件中的日志级别。

use crate::config::{LogLevel, LoggingConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// 安装全局tracing订阅者
///
/// 重复调用（或宿主已经安装了自己的订阅者）时静默跳过。
/// 只有在打开日志文件失败时才返回错误。
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter_directive()));

    if config.log_to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file_path)?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    } else if config.log_to_console {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init();
    }

    tracing::info!(target: "embed_bridge", "Logging initialized");
    Ok(())
}

impl LogLevel {
    /// 转换为 `EnvFilter` 指令
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
