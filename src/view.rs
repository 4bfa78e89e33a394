//! 运行时视图宿主
//!
//! 宿主的原生视图组件在挂载时初始化运行时并接管消息回调，
//! 卸载时根据 `auto_unload_on_unmount` 卸载运行时或仅暂停（保留状态以便快速重新挂载）。
//! 根视图的摆放和布局仍由宿主负责。

use crate::bridge::EmbeddedRuntimeBridge;
use crate::config::LifecycleConfig;
use crate::runtime::RootView;

/// 视图挂载状态
#[derive(Debug)]
pub struct RuntimeViewHost<'a> {
    bridge: &'a EmbeddedRuntimeBridge,
    auto_unload_on_unmount: bool,
    mounted: bool,
}

impl<'a> RuntimeViewHost<'a> {
    pub fn new(bridge: &'a EmbeddedRuntimeBridge) -> Self {
        Self::with_config(bridge, &LifecycleConfig::default())
    }

    pub fn with_config(bridge: &'a EmbeddedRuntimeBridge, config: &LifecycleConfig) -> Self {
        Self {
            bridge,
            auto_unload_on_unmount: config.auto_unload_on_unmount,
            mounted: false,
        }
    }

    pub fn set_auto_unload_on_unmount(&mut self, value: bool) {
        self.auto_unload_on_unmount = value;
    }

    pub fn auto_unload_on_unmount(&self) -> bool {
        self.auto_unload_on_unmount
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// 挂载视图：必要时初始化运行时，安装消息回调，返回可供宿主摆放的根视图
    ///
    /// 之前因卸载视图而暂停的运行时会被恢复。
    pub fn mount<F>(&mut self, on_message: F) -> Option<RootView>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if !self.bridge.is_initialized() {
            self.bridge.initialize();
        }
        self.bridge.pause(false);
        self.bridge.set_message_callback(on_message);
        self.mounted = true;

        let view = self.bridge.unity_root_view();
        if view.is_none() {
            tracing::debug!(target: "embed_bridge::view", "Runtime root view not available yet");
        }
        view
    }

    /// 卸载视图
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.bridge.clear_message_callback();

        if !self.bridge.is_initialized() {
            return;
        }

        if self.auto_unload_on_unmount {
            self.bridge.unload();
            tracing::info!(target: "embed_bridge::view", "Auto-unloaded (view unmounted)");
        } else {
            self.bridge.pause(true);
            tracing::info!(target: "embed_bridge::view", "Auto-paused on unmount (auto_unload_on_unmount=false)");
        }
    }
}

impl Drop for RuntimeViewHost<'_> {
    fn drop(&mut self) {
        self.unmount();
    }
}
