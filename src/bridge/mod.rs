//! 嵌入式运行时桥接
//!
//! 进程内唯一的 [`EmbeddedRuntimeBridge`] 持有至多一个运行时实例，负责：
//! - 生命周期控制（初始化、暂停/恢复、卸载）
//! - 宿主 → 运行时 的消息发送
//! - 运行时 → 宿主 的消息回调
//! - 运行时根视图/窗口的访问
//!
//! ## 状态机
//!
//! ```text
//! Uninitialized ──initialize──► Initializing ──► Active ◄──pause(false)── Paused
//!       ▲                            │             │ ──────pause(true)────►  │
//!       │                       (构造失败)          │                         │
//!       └──────────── Unloaded ◄─────unload────────┴─────────────────────────┘
//! ```
//!
//! `Unloaded` 会立即回到 `Uninitialized`，因此桥接可以被重新初始化。
//!
//! ## 线程约定
//!
//! 生命周期操作之间是串行的，应当在宿主主线程上调用。`Immediate` 模式下
//! 回调可能在运行时线程上、甚至在 `send_message` 的调用栈内同步触发，
//! 回调中不要再同步调用本桥接的生命周期操作；需要时改用 `HostQueue` 模式。
//! 查询操作（`is_initialized`、`state` 等）在回调中随时可用：停止运行时
//! 线程时桥接不持有内部锁。
//!
//! ## 错误策略
//!
//! 误用（例如初始化前发送消息）是空操作，构造失败只记录日志，
//! 运行时代码中的 panic 在桥接层被截获，任何错误都不会让宿主进程崩溃。

pub mod inbound;

use crate::config::{BridgeConfig, DeliveryMode};
use crate::core::error::{BridgeError, BridgeResult, RuntimeError, RuntimeResult};
use crate::runtime::{
    EmbeddedRuntime, MessageSink, OutboundMessage, RootView, RootWindow, RuntimeFactory,
    RuntimeInstanceId,
};
use inbound::InboundRouter;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

/// 进程内共享实例
static SHARED: OnceLock<EmbeddedRuntimeBridge> = OnceLock::new();

/// 桥接生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Active,
    Paused,
    Unloaded,
}

impl LifecycleState {
    /// 是否持有运行时
    pub fn is_initialized(&self) -> bool {
        matches!(self, LifecycleState::Active | LifecycleState::Paused)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Active => "active",
            LifecycleState::Paused => "paused",
            LifecycleState::Unloaded => "unloaded",
        };
        f.write_str(name)
    }
}

/// 已加载的运行时
struct LoadedRuntime {
    id: RuntimeInstanceId,
    runtime: Box<dyn EmbeddedRuntime>,
    sink: MessageSink,
}

struct BridgeInner {
    state: LifecycleState,
    loaded: Option<LoadedRuntime>,
}

/// 嵌入式运行时桥接
pub struct EmbeddedRuntimeBridge {
    factory: RwLock<Option<Arc<dyn RuntimeFactory>>>,
    inner: Mutex<BridgeInner>,
    inbound: Arc<InboundRouter>,
    next_instance: AtomicU64,
}

impl EmbeddedRuntimeBridge {
    /// 使用默认配置创建独立的桥接实例
    pub fn new<F>(factory: F) -> Self
    where
        F: RuntimeFactory + 'static,
    {
        Self::with_config(factory, &BridgeConfig::default())
    }

    pub fn with_config<F>(factory: F, config: &BridgeConfig) -> Self
    where
        F: RuntimeFactory + 'static,
    {
        let factory: Arc<dyn RuntimeFactory> = Arc::new(factory);
        Self::build(Some(factory), config)
    }

    fn build(factory: Option<Arc<dyn RuntimeFactory>>, config: &BridgeConfig) -> Self {
        Self {
            factory: RwLock::new(factory),
            inner: Mutex::new(BridgeInner {
                state: LifecycleState::Uninitialized,
                loaded: None,
            }),
            inbound: Arc::new(InboundRouter::new(&config.messaging)),
            next_instance: AtomicU64::new(1),
        }
    }

    /// 获取进程内共享实例
    ///
    /// 首次访问时创建，初始状态为 `Uninitialized`。并发首次访问也只会构造一个实例。
    /// 共享实例没有运行时构造器，需先调用 [`set_runtime_factory`](Self::set_runtime_factory)。
    pub fn shared() -> &'static EmbeddedRuntimeBridge {
        SHARED.get_or_init(|| {
            tracing::debug!(target: "embed_bridge", "Creating shared bridge instance");
            Self::build(None, &BridgeConfig::default())
        })
    }

    /// 注册（或替换）运行时构造器，下一次初始化时生效
    pub fn set_runtime_factory<F>(&self, factory: F)
    where
        F: RuntimeFactory + 'static,
    {
        let factory: Arc<dyn RuntimeFactory> = Arc::new(factory);
        let mut slot = self.factory.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(factory);
    }

    pub fn has_runtime_factory(&self) -> bool {
        self.factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// 应用配置中的消息投递方式，仅在未初始化且配置有效时生效
    pub fn configure(&self, config: &BridgeConfig) -> bool {
        let inner = self.lock_inner();
        if inner.state.is_initialized() {
            tracing::warn!(
                target: "embed_bridge",
                "Cannot reconfigure bridge while runtime is {}",
                inner.state
            );
            return false;
        }
        match self.inbound.configure(&config.messaging) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: "embed_bridge", "Messaging config rejected: {}", e);
                false
            }
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.inbound.delivery_mode()
    }

    fn lock_inner(&self) -> MutexGuard<'_, BridgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前生命周期状态
    pub fn state(&self) -> LifecycleState {
        self.lock_inner().state
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_inner().loaded.is_some()
    }

    /// 当前运行时实例标识，未初始化时为 `None`
    pub fn instance_id(&self) -> Option<RuntimeInstanceId> {
        self.lock_inner().loaded.as_ref().map(|loaded| loaded.id)
    }

    /// 初始化运行时
    ///
    /// 已初始化时为空操作；构造失败时记录日志并保持 `Uninitialized`，宿主可以重试。
    pub fn initialize(&self) {
        if let Err(e) = self.try_initialize() {
            tracing::error!(target: "embed_bridge", "Failed to initialize runtime: {}", e);
        }
    }

    /// 初始化运行时，返回当前（可能是已有的）运行时实例标识
    pub fn try_initialize(&self) -> BridgeResult<RuntimeInstanceId> {
        let mut inner = self.lock_inner();
        if let Some(loaded) = inner.loaded.as_ref() {
            tracing::debug!(target: "embed_bridge", "Runtime already initialized ({})", loaded.id);
            return Ok(loaded.id);
        }

        let factory = self
            .factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(BridgeError::NoRuntimeFactory)?;

        inner.state = LifecycleState::Initializing;

        let mut runtime = match guarded(|| factory.create()) {
            Ok(runtime) => runtime,
            Err(e) => {
                inner.state = LifecycleState::Uninitialized;
                return Err(BridgeError::Construction(e));
            }
        };

        let inbound = Arc::clone(&self.inbound);
        let sink = MessageSink::new(move |message| inbound.deliver(message));
        if !contained("attach_sink", || runtime.attach_sink(sink.clone())) {
            inner.state = LifecycleState::Uninitialized;
            return Err(BridgeError::Construction(RuntimeError::Other(
                "runtime panicked".to_string(),
            )));
        }

        if let Err(e) = guarded(|| runtime.start()) {
            sink.detach();
            inner.state = LifecycleState::Uninitialized;
            drop(inner);
            contained("shutdown", move || {
                let mut runtime = runtime;
                runtime.shutdown();
            });
            return Err(BridgeError::Start(e));
        }

        let id = RuntimeInstanceId(self.next_instance.fetch_add(1, Ordering::Relaxed));
        inner.loaded = Some(LoadedRuntime { id, runtime, sink });
        inner.state = LifecycleState::Active;
        tracing::info!(target: "embed_bridge", "Runtime initialized ({})", id);
        Ok(id)
    }

    /// 向运行时中的对象发送消息
    ///
    /// 未初始化时为空操作。暂停状态下同样转发，由运行时决定是否排队。
    pub fn send_message(&self, target: &str, method: &str, message: &str) {
        if let Err(e) = self.try_send_message(target, method, message) {
            tracing::debug!(target: "embed_bridge", "{}", e);
        }
    }

    pub fn try_send_message(&self, target: &str, method: &str, message: &str) -> BridgeResult<()> {
        let mut inner = self.lock_inner();
        let loaded = inner.loaded.as_mut().ok_or(BridgeError::NotInitialized {
            operation: "send_message",
        })?;

        let outbound = OutboundMessage::new(target, method, message);
        tracing::trace!(target: "embed_bridge", "Forwarding {} to {}", outbound, loaded.id);
        if !contained("send_message", || loaded.runtime.send_message(&outbound)) {
            return Err(BridgeError::RuntimePanicked {
                operation: "send_message",
            });
        }
        Ok(())
    }

    /// 暂停（`true`）或恢复（`false`）运行时，与当前状态一致时为空操作
    pub fn pause(&self, paused: bool) {
        let mut inner = self.lock_inner();
        let state = inner.state;
        let Some(loaded) = inner.loaded.as_mut() else {
            tracing::debug!(target: "embed_bridge", "Runtime not initialized, pause({}) ignored", paused);
            return;
        };

        let next = match (state, paused) {
            (LifecycleState::Active, true) => LifecycleState::Paused,
            (LifecycleState::Paused, false) => LifecycleState::Active,
            _ => {
                tracing::trace!(target: "embed_bridge", "Runtime already {}", state);
                return;
            }
        };

        if !contained("set_paused", || loaded.runtime.set_paused(paused)) {
            return;
        }
        inner.state = next;
        tracing::info!(target: "embed_bridge", "Runtime {}", next);
    }

    /// 卸载运行时，回到可重新初始化的 `Uninitialized` 状态
    pub fn unload(&self) {
        let loaded = {
            let mut inner = self.lock_inner();
            let Some(loaded) = inner.loaded.take() else {
                tracing::debug!(target: "embed_bridge", "Runtime not initialized, unload ignored");
                return;
            };

            inner.state = LifecycleState::Unloaded;
            loaded.sink.detach();
            let discarded = self.inbound.discard_pending();
            if discarded > 0 {
                tracing::debug!(target: "embed_bridge", "Discarded {} queued messages", discarded);
            }
            inner.state = LifecycleState::Uninitialized;
            loaded
        };

        // 运行时线程上的回调可能仍在查询桥接，停止运行时前先释放锁
        let id = loaded.id;
        contained("shutdown", move || {
            let mut loaded = loaded;
            loaded.runtime.shutdown();
        });
        tracing::info!(target: "embed_bridge", "Runtime unloaded ({})", id);
    }

    /// 运行时根视图，未初始化时为 `None`
    pub fn unity_root_view(&self) -> Option<RootView> {
        self.lock_inner()
            .loaded
            .as_ref()
            .and_then(|loaded| loaded.runtime.root_view())
    }

    /// 运行时窗口，未初始化时为 `None`
    pub fn unity_window(&self) -> Option<RootWindow> {
        self.lock_inner()
            .loaded
            .as_ref()
            .and_then(|loaded| loaded.runtime.root_window())
    }

    /// 设置入站消息回调，替换之前的回调
    pub fn set_message_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inbound.set_callback(Arc::new(callback));
    }

    pub fn clear_message_callback(&self) {
        self.inbound.clear_callback();
    }

    pub fn has_message_callback(&self) -> bool {
        self.inbound.has_callback()
    }

    /// `HostQueue` 模式下在当前线程投递排队消息，返回投递数量
    pub fn pump_messages(&self) -> usize {
        self.inbound.pump()
    }
}

impl Drop for EmbeddedRuntimeBridge {
    fn drop(&mut self) {
        self.unload();
    }
}

impl fmt::Debug for EmbeddedRuntimeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("EmbeddedRuntimeBridge")
            .field("state", &inner.state)
            .field("instance", &inner.loaded.as_ref().map(|loaded| loaded.id))
            .field("inbound", &self.inbound)
            .finish()
    }
}

/// 运行时代码中的 panic 不能穿过桥接层传给宿主
fn guarded<T>(f: impl FnOnce() -> RuntimeResult<T>) -> RuntimeResult<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(RuntimeError::Other("runtime panicked".to_string())))
}

/// 执行不返回结果的运行时调用，panic 只记录日志；返回调用是否正常完成
fn contained(operation: &str, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(_) => {
            tracing::error!(target: "embed_bridge", "Runtime panicked during {}", operation);
            false
        }
    }
}

#[cfg(test)]
mod tests;
