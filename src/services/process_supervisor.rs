use std::fs;
use std::path::Path;

use chrono::Utc;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::ShellError;
use crate::models::{LifecycleEvent, ServiceProcessHandle, SpawnConfig};
use crate::utils::process_killer;

// 后端进程环境变量约定
const ENV_STORAGE_DIR: &str = "APP_STORAGE_DIR";
const ENV_SECRET_KEY: &str = "SECRET_KEY";
const ENV_JWT_SECRET_KEY: &str = "JWT_SECRET_KEY";
const ENV_APP_MODE: &str = "APP_MODE";

/// 后端进程的全生命周期持有者
///
/// 同一时刻最多一个 Starting/Running 的进程。退出由独立的监视任务
/// 观察并通过事件通道上报；不做任何自动重启。
pub struct ProcessSupervisor {
    handle: ServiceProcessHandle,
    events: UnboundedSender<LifecycleEvent>,
}

impl ProcessSupervisor {
    pub fn new(events: UnboundedSender<LifecycleEvent>) -> Self {
        Self {
            handle: ServiceProcessHandle::new(),
            events,
        }
    }

    /// 进程句柄的只读视图
    pub fn handle(&self) -> &ServiceProcessHandle {
        &self.handle
    }

    /// 启动后端进程
    ///
    /// 存储目录（含缺失的上级目录）在 spawn 之前创建完成，
    /// 即使随后的 spawn 失败也保证目录已存在。
    pub fn spawn(&mut self, executable: &Path, config: &SpawnConfig) -> Result<(), ShellError> {
        if self.handle.is_active() {
            return Err(ShellError::AlreadyRunning {
                pid: self.handle.pid.unwrap_or(0),
            });
        }

        fs::create_dir_all(&config.storage_path).map_err(|e| ShellError::StorageDir {
            path: config.storage_path.clone(),
            source: e,
        })?;

        self.handle.mark_starting();
        tracing::info!(
            executable = %executable.display(),
            storage = %config.storage_path.display(),
            mode = config.operating_mode.as_env_str(),
            "启动后端进程"
        );

        // 继承父进程环境与标准流，叠加后端约定的变量；凭据不进日志
        let mut child = Command::new(executable)
            .env(ENV_STORAGE_DIR, &config.storage_path)
            .env(ENV_SECRET_KEY, &config.secrets.secret_key)
            .env(ENV_JWT_SECRET_KEY, &config.secrets.jwt_secret_key)
            .env(ENV_APP_MODE, config.operating_mode.as_env_str())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| {
                self.handle.mark_failed();
                ShellError::Spawn {
                    path: executable.to_path_buf(),
                    source: e,
                }
            })?;

        match child.id() {
            Some(pid) => {
                self.handle.mark_running(pid);
                tracing::info!(pid, "后端进程已启动");
            }
            None => {
                // spawn 刚返回就拿不到 pid，说明进程已被回收；
                // 退出事件仍会由下面的监视任务上报
                self.handle.mark_exited(None);
            }
        }

        let events = self.events.clone();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!(error = %e, "等待后端进程退出失败");
                    None
                }
            };
            // 壳层可能已经退出，接收端关闭不算错误
            let _ = events.send(LifecycleEvent::BackendExited { code });
        });

        Ok(())
    }

    /// 监视任务上报退出后由控制器调用：记录退出码并清空引用。
    /// 不自动重启——Ready 之后后端退出只会让界面进入降级状态。
    pub fn observe_exit(&mut self, code: Option<i32>) {
        if !self.handle.is_active() {
            tracing::debug!(?code, "忽略非活跃进程的退出通知");
            return;
        }

        let uptime_secs = self
            .handle
            .started_at
            .map(|t| (Utc::now() - t).num_seconds());
        self.handle.mark_exited(code);
        tracing::warn!(?code, ?uptime_secs, "后端进程已退出, 不会自动重启");
    }

    /// 终止后端进程：Running 状态下发送一次终止信号。
    /// 发完即返回，不确认退出；重复调用与无进程时调用均为静默空操作。
    pub fn terminate(&mut self) {
        match self.handle.take_running_pid() {
            Some(pid) => {
                tracing::info!(pid, "向后端进程发送终止信号");
                process_killer::signal_terminate(pid);
            }
            None => {
                tracing::debug!("没有运行中的后端进程, 终止为空操作");
            }
        }
    }
}
