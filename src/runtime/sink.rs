//! 运行时出站消息源
//!
//! 运行时通过 `MessageSink` 向宿主发出不透明字符串消息。
//! 一个 sink 只绑定一代运行时：桥接层卸载运行时时会将其断开，
//! 之后旧运行时（或其遗留线程）发出的消息全部丢弃。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Deliver = Arc<dyn Fn(String) + Send + Sync>;

/// 运行时 → 宿主 的消息出口，可以在任意线程上克隆和调用
#[derive(Clone)]
pub struct MessageSink {
    attached: Arc<AtomicBool>,
    deliver: Deliver,
}

impl MessageSink {
    /// 创建一个把消息交给 `deliver` 的 sink
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            attached: Arc::new(AtomicBool::new(true)),
            deliver: Arc::new(deliver),
        }
    }

    /// 不连接任何接收方的 sink
    pub fn detached() -> Self {
        let sink = Self::new(|_| {});
        sink.detach();
        sink
    }

    /// 发出一条消息，返回消息是否被交给了接收方
    pub fn emit(&self, message: impl Into<String>) -> bool {
        if !self.attached.load(Ordering::Acquire) {
            tracing::trace!(target: "embed_bridge", "Message dropped: sink detached");
            return false;
        }
        (self.deliver)(message.into());
        true
    }

    /// 断开 sink（对所有克隆同时生效）
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl fmt::Debug for MessageSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}
