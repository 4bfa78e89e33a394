//! C ABI
//!
//! 供原生宿主外壳（iOS / Android）调用的导出函数，全部作用于共享桥接。
//! 字符串参数为 UTF-8 编码、以 NUL 结尾的 C 字符串；空指针或非法编码会被拒绝并记录日志。
//! 运行时构造器需要在 Rust 侧通过 [`crate::api::set_runtime_factory`] 注册。

use crate::bridge::EmbeddedRuntimeBridge;
use raw_window_handle::RawWindowHandle;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

/// 宿主消息回调：消息字符串只在回调期间有效
pub type EmbedMessageCallback = extern "C" fn(message: *const c_char, user_data: *mut c_void);

/// 宿主传入的不透明用户数据，由宿主保证跨线程可用
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

/// panic 不能穿过 C ABI
fn ffi_guard<T>(operation: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        tracing::error!(target: "embed_bridge", "Panic in `{}` contained at FFI boundary", operation);
        fallback
    })
}

/// 把C字符串转换为 `&str`
///
/// # Safety
///
/// `ptr` 为空或指向一个在返回值生命周期内有效的 NUL 结尾字符串。
unsafe fn c_str<'a>(ptr: *const c_char, name: &str) -> Option<&'a str> {
    if ptr.is_null() {
        tracing::warn!(target: "embed_bridge", "Null `{}` passed over FFI", name);
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            tracing::warn!(target: "embed_bridge", "`{}` is not valid UTF-8", name);
            None
        }
    }
}

/// 把C回调包装为桥接回调
fn adapt_callback(
    callback: EmbedMessageCallback,
    user_data: *mut c_void,
) -> impl Fn(&str) + Send + Sync + 'static {
    let user_data = UserData(user_data);
    move |message: &str| match CString::new(message) {
        Ok(c_message) => {
            let data = user_data;
            callback(c_message.as_ptr(), data.0)
        }
        Err(_) => {
            tracing::warn!(target: "embed_bridge", "Message contains interior NUL, not delivered over FFI")
        }
    }
}

/// 提取平台原生句柄指针，不支持的平台返回空指针
fn native_pointer(raw: RawWindowHandle) -> *mut c_void {
    match raw {
        RawWindowHandle::UiKit(handle) => handle.ui_view.as_ptr(),
        RawWindowHandle::AppKit(handle) => handle.ns_view.as_ptr(),
        RawWindowHandle::AndroidNdk(handle) => handle.a_native_window.as_ptr(),
        _ => ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn embed_bridge_initialize() {
    ffi_guard("initialize", (), || {
        EmbeddedRuntimeBridge::shared().initialize()
    })
}

#[no_mangle]
pub extern "C" fn embed_bridge_is_initialized() -> bool {
    ffi_guard("is_initialized", false, || {
        EmbeddedRuntimeBridge::shared().is_initialized()
    })
}

/// # Safety
///
/// 三个参数必须为空或有效的 NUL 结尾字符串。
#[no_mangle]
pub unsafe extern "C" fn embed_bridge_send_message(
    target: *const c_char,
    method: *const c_char,
    message: *const c_char,
) {
    let (Some(target), Some(method), Some(message)) = (
        c_str(target, "target"),
        c_str(method, "method"),
        c_str(message, "message"),
    ) else {
        return;
    };

    ffi_guard("send_message", (), || {
        EmbeddedRuntimeBridge::shared().send_message(target, method, message)
    })
}

#[no_mangle]
pub extern "C" fn embed_bridge_pause(paused: bool) {
    ffi_guard("pause", (), || EmbeddedRuntimeBridge::shared().pause(paused))
}

#[no_mangle]
pub extern "C" fn embed_bridge_unload() {
    ffi_guard("unload", (), || EmbeddedRuntimeBridge::shared().unload())
}

/// 设置消息回调，`callback` 为空时清除回调
///
/// # Safety
///
/// `user_data` 在回调被替换或清除之前必须保持有效，且可以在运行时线程上使用。
#[no_mangle]
pub unsafe extern "C" fn embed_bridge_set_message_callback(
    callback: Option<EmbedMessageCallback>,
    user_data: *mut c_void,
) {
    let bridge = EmbeddedRuntimeBridge::shared();
    match callback {
        Some(callback) => bridge.set_message_callback(adapt_callback(callback, user_data)),
        None => bridge.clear_message_callback(),
    }
}

/// `HostQueue` 模式下在调用线程上投递排队消息
#[no_mangle]
pub extern "C" fn embed_bridge_pump_messages() -> usize {
    ffi_guard("pump_messages", 0, || {
        EmbeddedRuntimeBridge::shared().pump_messages()
    })
}

/// 运行时根视图的原生指针（`UIView*` / `NSView*` / `ANativeWindow*`），不可用时为空
#[no_mangle]
pub extern "C" fn embed_bridge_root_view() -> *mut c_void {
    ffi_guard("root_view", ptr::null_mut(), || {
        EmbeddedRuntimeBridge::shared()
            .unity_root_view()
            .map(|view| native_pointer(view.raw()))
            .unwrap_or(ptr::null_mut())
    })
}

#[no_mangle]
pub extern "C" fn embed_bridge_root_window() -> *mut c_void {
    ffi_guard("root_window", ptr::null_mut(), || {
        EmbeddedRuntimeBridge::shared()
            .unity_window()
            .map(|window| native_pointer(window.raw()))
            .unwrap_or(ptr::null_mut())
    })
}
