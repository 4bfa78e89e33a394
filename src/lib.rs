//! # Embed Bridge
//!
//! Lifecycle and messaging bridge for hosting an embedded game runtime inside a
//! native application.
//!
//! ## Features
//!
//! - **Singleton Bridge**: one process-wide [`EmbeddedRuntimeBridge`] owning at most one runtime
//! - **Lifecycle State Machine**: initialize, pause/resume, unload and re-initialize
//! - **Messaging**: fire-and-forget `(target, method, payload)` sends, single-slot inbound callback
//! - **Host Integration**: background/foreground observer, view mount policy, C ABI
//! - **Headless Runtime**: in-process runtime for desktop and tests
//!
//! ## Architecture Design
//!
//! 运行时被视为不透明的能力对象（[`runtime::EmbeddedRuntime`]），
//! 桥接层只负责生命周期和消息转发，不涉及渲染、物理或宿主的视图布局。
//!
//! ### Example
//!
//! ```rust
//! use embed_bridge::bridge::EmbeddedRuntimeBridge;
//! use embed_bridge::runtime::HeadlessRuntimeFactory;
//!
//! let factory = HeadlessRuntimeFactory::new().on("Main", "Ping", |payload, sink| {
//!     sink.emit(format!("pong:{}", payload));
//! });
//! let bridge = EmbeddedRuntimeBridge::new(factory);
//!
//! bridge.set_message_callback(|message| println!("runtime says {}", message));
//! bridge.initialize();
//! bridge.send_message("Main", "Ping", "1");
//! bridge.unload();
//! assert!(!bridge.is_initialized());
//! ```
//!
//! ## Modules
//!
//! - [`core`]: errors, logging
//! - [`config`]: configuration
//! - [`runtime`]: runtime capability and headless runtime
//! - [`bridge`]: the bridge and its state machine
//! - [`lifecycle`]: host lifecycle observer
//! - [`view`]: view mount/unmount policy
//! - [`api`]: free functions over the shared bridge
//! - [`ffi`]: C ABI

/// Core functionality: errors, logging
pub mod core;
/// Configuration system
pub mod config;
/// Embedded runtime capability abstraction
pub mod runtime;
/// Runtime bridge and lifecycle state machine
pub mod bridge;
/// Host application lifecycle integration
pub mod lifecycle;
/// Native view mount policy
pub mod view;
/// Host-facing functions over the shared bridge
pub mod api;
/// C ABI for native host shells
pub mod ffi;

pub use bridge::{EmbeddedRuntimeBridge, LifecycleState};
pub use config::BridgeConfig;
pub use crate::core::error::{BridgeError, BridgeResult, RuntimeError, RuntimeResult};
pub use runtime::{
    EmbeddedRuntime, MessageSink, OutboundMessage, RootView, RootWindow, RuntimeFactory,
    RuntimeInstanceId,
};
