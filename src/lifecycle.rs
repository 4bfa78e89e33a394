//! 宿主应用生命周期联动
//!
//! 宿主进入后台时自动暂停运行时、回到前台时自动恢复、进程终止时卸载。
//! 只恢复由自己暂停的运行时：宿主主动暂停的运行时在回到前台后保持暂停。

use crate::bridge::{EmbeddedRuntimeBridge, LifecycleState};
use crate::config::LifecycleConfig;
use std::sync::atomic::{AtomicBool, Ordering};

/// 宿主生命周期观察者
#[derive(Debug)]
pub struct HostLifecycleObserver<'a> {
    bridge: &'a EmbeddedRuntimeBridge,
    config: LifecycleConfig,
    /// 进入后台前运行时是否处于运行状态
    was_running_before_background: AtomicBool,
}

impl<'a> HostLifecycleObserver<'a> {
    pub fn new(bridge: &'a EmbeddedRuntimeBridge, config: LifecycleConfig) -> Self {
        Self {
            bridge,
            config,
            was_running_before_background: AtomicBool::new(false),
        }
    }

    /// 宿主即将进入后台
    pub fn on_enter_background(&self) {
        if !self.config.auto_pause_on_background {
            return;
        }

        if self.bridge.state() == LifecycleState::Active {
            self.was_running_before_background
                .store(true, Ordering::SeqCst);
            self.bridge.pause(true);
            tracing::info!(target: "embed_bridge::lifecycle", "Auto-paused (host entering background)");
        } else {
            self.was_running_before_background
                .store(false, Ordering::SeqCst);
        }
    }

    /// 宿主回到前台
    pub fn on_enter_foreground(&self) {
        if !self.config.auto_pause_on_background {
            return;
        }

        if self
            .was_running_before_background
            .swap(false, Ordering::SeqCst)
        {
            self.bridge.pause(false);
            tracing::info!(target: "embed_bridge::lifecycle", "Auto-resumed (host entering foreground)");
        }
    }

    /// 宿主进程即将终止
    pub fn on_terminate(&self) {
        if !self.config.auto_unload_on_terminate {
            return;
        }

        if self.bridge.is_initialized() {
            self.bridge.unload();
            tracing::info!(target: "embed_bridge::lifecycle", "Auto-unloaded (host terminating)");
        }
    }

    /// 下一次回到前台时是否会自动恢复
    pub fn will_resume_on_foreground(&self) -> bool {
        self.was_running_before_background.load(Ordering::SeqCst)
    }
}
