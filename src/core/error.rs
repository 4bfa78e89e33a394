//! 统一错误处理模块
//!
//! 提供桥接层范围内的错误类型定义
//!
//! ## 错误类型分层
//!
//! - **运行时错误** (`RuntimeError`): 嵌入式运行时自身报告的错误（构造、启动、通道断开）
//! - **桥接错误** (`BridgeError`): 生命周期前置条件不满足、构造失败等
//!
//! 桥接层的普通操作从不向宿主传播错误，只记录日志；
//! `try_*` 系列操作把同样的结果以 `BridgeResult` 的形式交给需要它的宿主。

use thiserror::Error;

/// 嵌入式运行时错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Runtime unavailable: {0}")]
    Unavailable(String),

    #[error("Runtime failed to start: {0}")]
    StartFailed(String),

    #[error("Runtime command channel disconnected")]
    Disconnected,

    #[error("Runtime error: {0}")]
    Other(String),
}

/// 桥接层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// 在未初始化状态下调用了需要运行时的操作
    #[error("Runtime not initialized, `{operation}` ignored")]
    NotInitialized { operation: &'static str },

    #[error("No runtime factory registered")]
    NoRuntimeFactory,

    #[error("Runtime construction failed: {0}")]
    Construction(RuntimeError),

    #[error("Runtime start failed: {0}")]
    Start(RuntimeError),

    /// 运行时在处理操作时 panic，已被桥接层截获
    #[error("Runtime panicked during `{operation}`")]
    RuntimePanicked { operation: &'static str },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// 是否属于前置条件错误（宿主误用，可安全忽略）
    pub fn is_precondition(&self) -> bool {
        matches!(self, BridgeError::NotInitialized { .. })
    }
}
