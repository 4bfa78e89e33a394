/// 生命周期配置

use serde::{Deserialize, Serialize};

/// 宿主生命周期联动配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// 宿主进入后台时自动暂停，回到前台时自动恢复
    pub auto_pause_on_background: bool,

    /// 宿主进程终止时自动卸载运行时
    pub auto_unload_on_terminate: bool,

    /// 视图卸载时卸载运行时（否则仅暂停，保留状态以便快速重新挂载）
    pub auto_unload_on_unmount: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            auto_pause_on_background: true,
            auto_unload_on_terminate: true,
            auto_unload_on_unmount: true,
        }
    }
}
