//! 入站消息投递
//!
//! 单槽回调：设置新回调会替换旧回调，不支持多订阅者。
//! 回调不绑定线程。`Immediate` 模式下回调运行在运行时发出消息的线程上；
//! 需要在宿主指定的执行上下文中处理时使用 `HostQueue` 模式，由宿主调用
//! [`InboundRouter::pump`] 取出消息。

use crate::config::{ConfigResult, DeliveryMode, MessagingConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// 宿主消息回调
pub type MessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct HostQueue {
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl HostQueue {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = if capacity == 0 {
            unbounded()
        } else {
            bounded(capacity)
        };
        Self { tx, rx }
    }
}

/// 入站消息路由
pub struct InboundRouter {
    callback: RwLock<Option<MessageCallback>>,
    queue: RwLock<Option<HostQueue>>,
}

impl InboundRouter {
    /// 创建路由，配置无效时退回默认投递方式
    pub fn new(config: &MessagingConfig) -> Self {
        let router = Self {
            callback: RwLock::new(None),
            queue: RwLock::new(None),
        };
        if let Err(e) = router.configure(config) {
            tracing::warn!(target: "embed_bridge", "{}, using default message delivery", e);
            let _ = router.configure(&MessagingConfig::default());
        }
        router
    }

    /// 切换投递方式。切换时丢弃尚未取出的排队消息；配置无效时保持原状
    pub fn configure(&self, config: &MessagingConfig) -> ConfigResult<()> {
        config.validate()?;
        let mut queue = self.queue.write().unwrap_or_else(PoisonError::into_inner);
        *queue = match config.delivery {
            DeliveryMode::Immediate => None,
            DeliveryMode::HostQueue => Some(HostQueue::new(config.queue_capacity)),
        };
        Ok(())
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        let queue = self.queue.read().unwrap_or_else(PoisonError::into_inner);
        if queue.is_some() {
            DeliveryMode::HostQueue
        } else {
            DeliveryMode::Immediate
        }
    }

    pub fn set_callback(&self, callback: MessageCallback) {
        let mut slot = self.callback.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(callback);
    }

    pub fn clear_callback(&self) {
        let mut slot = self.callback.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    pub fn has_callback(&self) -> bool {
        self.callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn current_callback(&self) -> Option<MessageCallback> {
        self.callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 接收运行时发出的一条消息
    pub fn deliver(&self, message: String) {
        {
            let queue = self.queue.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(queue) = queue.as_ref() {
                match queue.tx.try_send(message) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(target: "embed_bridge", "Host message queue full, message dropped")
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        tracing::warn!(target: "embed_bridge", "Host message queue closed, message dropped")
                    }
                }
                return;
            }
        }

        // 锁外调用，回调中可以安全地替换回调
        match self.current_callback() {
            Some(callback) => callback(&message),
            None => tracing::trace!(target: "embed_bridge", "No message callback, message dropped"),
        }
    }

    /// 在调用线程上投递所有排队消息，返回交给回调的消息数
    pub fn pump(&self) -> usize {
        let drained: Vec<String> = {
            let queue = self.queue.read().unwrap_or_else(PoisonError::into_inner);
            match queue.as_ref() {
                Some(queue) => queue.rx.try_iter().collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for message in drained {
            // 每条消息重新读取回调槽，保证替换后的消息只交给新回调
            match self.current_callback() {
                Some(callback) => {
                    callback(&message);
                    delivered += 1;
                }
                None => tracing::trace!(target: "embed_bridge", "No message callback, message dropped"),
            }
        }
        delivered
    }

    /// 丢弃所有排队消息，返回丢弃数量
    pub fn discard_pending(&self) -> usize {
        let queue = self.queue.read().unwrap_or_else(PoisonError::into_inner);
        queue
            .as_ref()
            .map(|queue| queue.rx.try_iter().count())
            .unwrap_or(0)
    }
}

impl fmt::Debug for InboundRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundRouter")
            .field("delivery", &self.delivery_mode())
            .field("has_callback", &self.has_callback())
            .finish()
    }
}
