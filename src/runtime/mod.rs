//! 嵌入式运行时能力抽象
//!
//! 桥接层把第三方运行时（游戏/渲染引擎）视为一个不透明的能力对象，
//! 只通过 [`EmbeddedRuntime`] 与之交互。这让真实引擎和测试替身可以互换。
//!
//! ```text
//! ┌──────────────┐   send_message / set_paused   ┌──────────────────┐
//! │    Bridge    │ ────────────────────────────► │ EmbeddedRuntime  │
//! │              │ ◄──────────────────────────── │  (engine thread) │
//! └──────────────┘         MessageSink::emit     └──────────────────┘
//! ```

pub mod headless;
pub mod sink;
pub mod surface;

use crate::core::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use headless::{HeadlessRuntime, HeadlessRuntimeFactory};
pub use sink::MessageSink;
pub use surface::{RootView, RootWindow};

/// 宿主发往运行时的消息：目标对象、方法名和不透明负载
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub target: String,
    pub method: String,
    pub payload: String,
}

impl OutboundMessage {
    pub fn new(
        target: impl Into<String>,
        method: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
            payload: payload.into(),
        }
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({} bytes)", self.target, self.method, self.payload.len())
    }
}

/// 运行时实例标识，每次构造单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuntimeInstanceId(pub u64);

impl fmt::Display for RuntimeInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime#{}", self.0)
    }
}

/// 嵌入式运行时
///
/// 所有方法都由桥接层在宿主主线程上串行调用。
/// 出站消息可以在运行时自己的线程上通过 sink 发出。
pub trait EmbeddedRuntime: Send {
    /// 安装出站消息出口，在 `start` 之前调用
    fn attach_sink(&mut self, sink: MessageSink);

    /// 启动运行时。内部启动可以是异步的，桥接层不等待完成
    fn start(&mut self) -> RuntimeResult<()>;

    /// 分发一条消息。投递失败（目标对象或方法不存在）由运行时自行处理
    fn send_message(&mut self, message: &OutboundMessage);

    /// 暂停或恢复内部循环
    fn set_paused(&mut self, paused: bool);

    /// 同步关闭运行时并释放资源
    fn shutdown(&mut self);

    fn root_view(&self) -> Option<RootView>;

    fn root_window(&self) -> Option<RootWindow>;
}

/// 运行时构造器
pub trait RuntimeFactory: Send + Sync {
    fn create(&self) -> RuntimeResult<Box<dyn EmbeddedRuntime>>;
}

impl<F> RuntimeFactory for F
where
    F: Fn() -> RuntimeResult<Box<dyn EmbeddedRuntime>> + Send + Sync,
{
    fn create(&self) -> RuntimeResult<Box<dyn EmbeddedRuntime>> {
        self()
    }
}

/// 在当前平台上不可用的运行时构造器（例如 iOS 模拟器）
#[derive(Debug, Clone)]
pub struct UnavailableRuntime {
    reason: String,
}

impl UnavailableRuntime {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RuntimeFactory for UnavailableRuntime {
    fn create(&self) -> RuntimeResult<Box<dyn EmbeddedRuntime>> {
        Err(RuntimeError::Unavailable(self.reason.clone()))
    }
}
