use serde::{Deserialize, Serialize};

/// 生命周期事件：操作系统 / 应用层信号，统一送入 LifecycleController 消费
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// 应用启动（仅 Idle 阶段有效）
    Startup,
    /// 重新激活（如 macOS dock 点击），零窗口时重建
    Reactivate,
    /// 用户关闭了展示窗口
    WindowClosed,
    /// 退出请求（菜单退出、SIGINT/SIGTERM）
    QuitRequested,
    /// 后端进程退出（监视任务上报）
    BackendExited { code: Option<i32> },
    /// 其他未捕获错误（仅 Initializing 阶段致命）
    RuntimeError { message: String },
}

/// 所有窗口关闭后的平台策略
///
/// 作为显式注入的策略值存在，而不是在生命周期代码里
/// 按平台字符串写死分支。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundPolicy {
    /// 最后一个窗口关闭即退出（Windows / Linux 惯例）
    ExitOnLastWindowClosed,
    /// 允许零窗口常驻，等待重新激活（macOS 惯例）
    StayResident,
}

impl BackgroundPolicy {
    /// 按宿主平台推导默认策略，仍可被配置覆盖
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            BackgroundPolicy::StayResident
        } else {
            BackgroundPolicy::ExitOnLastWindowClosed
        }
    }
}
