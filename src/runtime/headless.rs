//! 无界面运行时
//!
//! 在独立线程上运行的进程内运行时，没有可视表面。
//! 宿主消息通过命令通道送入运行时线程，按 `(目标对象, 方法)` 分发给注册的处理函数；
//! 处理函数可以通过 [`MessageSink`] 向宿主回发消息。
//!
//! 可用于桌面/CI 环境，以及作为 [`EmbeddedRuntime`] 的参考实现。

use super::{EmbeddedRuntime, MessageSink, OutboundMessage, RootView, RootWindow, RuntimeFactory};
use crate::core::error::{RuntimeError, RuntimeResult};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;

/// 方法处理函数：接收负载和回发出口
pub type MethodHandler = Arc<dyn Fn(&str, &MessageSink) + Send + Sync>;

type HandlerTable = HashMap<String, HashMap<String, MethodHandler>>;

/// 运行时线程命令
enum EngineCommand {
    Dispatch(OutboundMessage),
    SetPaused(bool),
    Shutdown,
}

/// 无界面运行时构造器
///
/// 处理函数表在所有由它构造的运行时之间共享。
#[derive(Clone, Default)]
pub struct HeadlessRuntimeFactory {
    handlers: Arc<HandlerTable>,
}

impl HeadlessRuntimeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 `target.method` 的处理函数，重复注册会覆盖之前的处理函数
    pub fn on<F>(mut self, target: impl Into<String>, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &MessageSink) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.handlers)
            .entry(target.into())
            .or_default()
            .insert(method.into(), Arc::new(handler));
        self
    }

    /// 已注册的处理函数数量
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(HashMap::len).sum()
    }

    /// 构造一个尚未启动的运行时
    pub fn build(&self) -> HeadlessRuntime {
        HeadlessRuntime {
            handlers: Arc::clone(&self.handlers),
            sink: None,
            commands: None,
            worker: None,
        }
    }
}

impl RuntimeFactory for HeadlessRuntimeFactory {
    fn create(&self) -> RuntimeResult<Box<dyn EmbeddedRuntime>> {
        Ok(Box::new(self.build()))
    }
}

/// 无界面运行时
pub struct HeadlessRuntime {
    handlers: Arc<HandlerTable>,
    sink: Option<MessageSink>,
    commands: Option<Sender<EngineCommand>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl HeadlessRuntime {
    /// 运行时线程是否在运行
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn post(&self, command: EngineCommand) -> RuntimeResult<()> {
        let tx = self
            .commands
            .as_ref()
            .ok_or_else(|| RuntimeError::Unavailable("runtime not started".to_string()))?;
        tx.send(command).map_err(|_| RuntimeError::Disconnected)
    }

    fn post_or_warn(&self, command: EngineCommand) {
        if let Err(e) = self.post(command) {
            tracing::warn!(target: "embed_bridge::headless", "Command dropped: {}", e);
        }
    }

    /// 运行时线程主循环
    fn run_loop(handlers: Arc<HandlerTable>, sink: MessageSink, rx: Receiver<EngineCommand>) {
        let mut paused = false;
        let mut pending: VecDeque<OutboundMessage> = VecDeque::new();

        for command in rx.iter() {
            match command {
                EngineCommand::Dispatch(message) => {
                    if paused {
                        pending.push_back(message);
                    } else {
                        Self::dispatch(&handlers, &sink, &message);
                    }
                }
                EngineCommand::SetPaused(value) => {
                    paused = value;
                    if !paused {
                        while let Some(message) = pending.pop_front() {
                            Self::dispatch(&handlers, &sink, &message);
                        }
                    }
                }
                EngineCommand::Shutdown => break,
            }
        }

        if !pending.is_empty() {
            tracing::debug!(
                target: "embed_bridge::headless",
                "Dropping {} queued messages on shutdown",
                pending.len()
            );
        }
    }

    fn dispatch(handlers: &HandlerTable, sink: &MessageSink, message: &OutboundMessage) {
        match handlers
            .get(&message.target)
            .and_then(|methods| methods.get(&message.method))
        {
            Some(handler) => handler(&message.payload, sink),
            None => tracing::warn!(
                target: "embed_bridge::headless",
                "No handler for {}.{}, message ignored",
                message.target,
                message.method
            ),
        }
    }
}

impl EmbeddedRuntime for HeadlessRuntime {
    fn attach_sink(&mut self, sink: MessageSink) {
        self.sink = Some(sink);
    }

    fn start(&mut self) -> RuntimeResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (tx, rx) = unbounded();
        let handlers = Arc::clone(&self.handlers);
        let sink = self.sink.clone().unwrap_or_else(MessageSink::detached);

        let worker = thread::Builder::new()
            .name("headless-runtime".to_string())
            .spawn(move || Self::run_loop(handlers, sink, rx))
            .map_err(|e| RuntimeError::StartFailed(e.to_string()))?;

        self.commands = Some(tx);
        self.worker = Some(worker);
        tracing::debug!(target: "embed_bridge::headless", "Headless runtime started");
        Ok(())
    }

    fn send_message(&mut self, message: &OutboundMessage) {
        self.post_or_warn(EngineCommand::Dispatch(message.clone()));
    }

    fn set_paused(&mut self, paused: bool) {
        self.post_or_warn(EngineCommand::SetPaused(paused));
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(EngineCommand::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(target: "embed_bridge::headless", "Runtime thread panicked");
            }
            tracing::debug!(target: "embed_bridge::headless", "Headless runtime stopped");
        }
    }

    fn root_view(&self) -> Option<RootView> {
        None
    }

    fn root_window(&self) -> Option<RootWindow> {
        None
    }
}

impl Drop for HeadlessRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
