//! 宿主侧便捷函数
//!
//! 作用于 [`EmbeddedRuntimeBridge::shared`] 的自由函数，供脚本层或平台模块直接调用。

use crate::bridge::EmbeddedRuntimeBridge;
use crate::runtime::RuntimeFactory;

/// 注册共享桥接使用的运行时构造器
pub fn set_runtime_factory<F>(factory: F)
where
    F: RuntimeFactory + 'static,
{
    EmbeddedRuntimeBridge::shared().set_runtime_factory(factory);
}

/// 初始化共享运行时
pub fn initialize() {
    EmbeddedRuntimeBridge::shared().initialize();
}

/// 向运行时中的对象发送消息
pub fn post_message(target: &str, method: &str, message: &str) {
    EmbeddedRuntimeBridge::shared().send_message(target, method, message);
}

/// 暂停运行时的渲染和执行
pub fn pause_runtime() {
    EmbeddedRuntimeBridge::shared().pause(true);
}

/// 恢复运行时的渲染和执行
pub fn resume_runtime() {
    EmbeddedRuntimeBridge::shared().pause(false);
}

/// 卸载运行时并释放内存，之后需要重新初始化
pub fn unload_runtime() {
    EmbeddedRuntimeBridge::shared().unload();
}

pub fn is_initialized() -> bool {
    EmbeddedRuntimeBridge::shared().is_initialized()
}
