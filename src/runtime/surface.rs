//! 运行时可视表面引用
//!
//! 桥接层只暴露引用，不负责表面在宿主视图层级中的摆放。
//! 引用是非拥有的：宿主不能假设它们的生命周期长于运行时本身。

use raw_window_handle::RawWindowHandle;

/// 运行时根视图（iOS 上对应 `UIView`，Android 上对应承载渲染的 `FrameLayout`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootView {
    raw: RawWindowHandle,
}

impl RootView {
    pub fn from_raw(raw: RawWindowHandle) -> Self {
        Self { raw }
    }

    /// 原始平台句柄
    pub fn raw(&self) -> RawWindowHandle {
        self.raw
    }
}

/// 运行时自己的窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootWindow {
    raw: RawWindowHandle,
}

impl RootWindow {
    pub fn from_raw(raw: RawWindowHandle) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> RawWindowHandle {
        self.raw
    }
}
