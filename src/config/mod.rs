/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量和运行时动态调整
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub mod lifecycle;
pub mod messaging;

pub use lifecycle::LifecycleConfig;
pub use messaging::{DeliveryMode, MessagingConfig};

/// 桥接配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 桥接主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 生命周期配置
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// 消息配置
    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl BridgeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        // 日志配置
        if let Ok(val) = env::var("EMBED_BRIDGE_LOG_LEVEL") {
            if let Ok(level) = val.parse() {
                self.logging.level = level;
            }
        }
        if let Ok(val) = env::var("EMBED_BRIDGE_LOG_FILE") {
            self.logging.log_to_file = true;
            self.logging.log_file_path = val;
        }

        // 生命周期配置
        if let Ok(val) = env::var("EMBED_BRIDGE_AUTO_PAUSE") {
            self.lifecycle.auto_pause_on_background = val
                .parse()
                .unwrap_or(self.lifecycle.auto_pause_on_background);
        }
        if let Ok(val) = env::var("EMBED_BRIDGE_AUTO_UNLOAD_ON_TERMINATE") {
            self.lifecycle.auto_unload_on_terminate = val
                .parse()
                .unwrap_or(self.lifecycle.auto_unload_on_terminate);
        }
        if let Ok(val) = env::var("EMBED_BRIDGE_AUTO_UNLOAD_ON_UNMOUNT") {
            self.lifecycle.auto_unload_on_unmount = val
                .parse()
                .unwrap_or(self.lifecycle.auto_unload_on_unmount);
        }

        // 消息配置
        if let Ok(val) = env::var("EMBED_BRIDGE_DELIVERY") {
            match val.to_ascii_lowercase().as_str() {
                "immediate" => self.messaging.delivery = DeliveryMode::Immediate,
                "host_queue" => self.messaging.delivery = DeliveryMode::HostQueue,
                other => {
                    tracing::warn!(target: "embed_bridge", "Unknown delivery mode `{}` ignored", other)
                }
            }
        }
        if let Ok(val) = env::var("EMBED_BRIDGE_QUEUE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                self.messaging.queue_capacity = capacity;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.logging.validate()?;
        self.messaging.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./embed_bridge.toml
    /// 2. ./embed_bridge.json
    /// 3. ~/.config/embed_bridge/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("embed_bridge.toml") {
            tracing::info!(target: "embed_bridge", "Loaded config from embed_bridge.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("embed_bridge.json") {
            tracing::info!(target: "embed_bridge", "Loaded config from embed_bridge.json");
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("embed_bridge")
                .join("config.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "embed_bridge", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "embed_bridge", "Using default configuration");
        Self::default()
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到文件
    pub log_to_file: bool,

    /// 日志文件路径
    pub log_file_path: String,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_to_file: false,
            log_file_path: "embed_bridge.log".to_string(),
            log_to_console: true,
        }
    }
}

impl LoggingConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.log_to_file && self.log_file_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_to_file is set but log_file_path is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::ParseError(format!("Unknown log level: {}", other))),
        }
    }
}
