#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

mod error;
mod models;
mod services;
mod state;
mod utils;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use models::{BridgeCapabilities, LifecycleEvent, WindowOptions};
use services::{
    LifecycleController, NullSurface, ProcessSupervisor, ReadinessProbe, ShellConfig,
    WindowCoordinator,
};

// 生命周期单线程驱动：spawn、探测、窗口创建都在同一个逻辑线程上，
// 后端进程只通过回环网络交互
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("guanjia_shell=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // 未捕获异常只记日志，不拖垮已就绪的界面
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(%info, "未捕获异常");
    }));

    let config = match ShellConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "加载配置失败");
            std::process::exit(1);
        }
    };
    tracing::info!(
        mode = config.operating_mode.as_env_str(),
        backend = %config.backend_executable.display(),
        "壳层启动"
    );

    let (tx, rx) = mpsc::unbounded_channel();

    // Ctrl-C / SIGTERM 统一映射为退出请求，探测中也能立即生效
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(LifecycleEvent::QuitRequested);
            }
        });
    }
    #[cfg(unix)]
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    if sigterm.recv().await.is_some() {
                        let _ = tx.send(LifecycleEvent::QuitRequested);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "注册 SIGTERM 处理失败"),
            }
        });
    }

    let supervisor = ProcessSupervisor::new(tx.clone());
    let probe = ReadinessProbe::new();
    let coordinator = WindowCoordinator::new(
        NullSurface,
        WindowOptions::default(),
        BridgeCapabilities::new(config.operating_mode),
    );
    let controller = LifecycleController::new(config, supervisor, probe, coordinator, rx);

    let _ = tx.send(LifecycleEvent::Startup);

    if let Err(e) = controller.run().await {
        tracing::error!(error = %e, "启动失败, 应用退出");
        std::process::exit(1);
    }
}
