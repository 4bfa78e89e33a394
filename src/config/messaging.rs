/// 消息投递配置

use serde::{Deserialize, Serialize};
use super::{ConfigError, ConfigResult};

/// 队列容量上限
pub const MAX_QUEUE_CAPACITY: usize = 1_000_000;

/// 入站消息投递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// 在运行时发出消息的线程上直接调用回调
    #[default]
    Immediate,
    /// 消息进入队列，由宿主在自己的执行上下文中调用 `pump_messages` 取出
    HostQueue,
}

/// 消息配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// 投递方式
    pub delivery: DeliveryMode,

    /// `HostQueue` 模式下的队列容量（0 表示无界）
    pub queue_capacity: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryMode::Immediate,
            queue_capacity: 0,
        }
    }
}

impl MessagingConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::ValidationError(format!(
                "Queue capacity {} exceeds maximum {}",
                self.queue_capacity, MAX_QUEUE_CAPACITY
            )));
        }
        Ok(())
    }
}
