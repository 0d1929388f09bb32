/// 向后端进程发送一次终止信号
///
/// 发完即返回，不等待也不确认进程真正退出（孤儿由操作系统回收），
/// 也不做 SIGKILL 升级。任何发送失败只记日志，绝不向调用方抛错。
pub fn signal_terminate(pid: u32) {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        use std::process::Command;

        let mut kill_command = Command::new("taskkill");
        kill_command.args(&["/PID", &pid.to_string(), "/T", "/F"]);

        // 隐藏 taskkill 窗口
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        kill_command.creation_flags(CREATE_NO_WINDOW);

        if let Err(e) = kill_command.spawn() {
            tracing::warn!(pid, error = %e, "发送终止信号失败");
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => {}
            // 进程已经不在了，视同成功
            Err(nix::errno::Errno::ESRCH) => {
                tracing::debug!(pid, "终止信号目标进程已不存在");
            }
            Err(e) => {
                tracing::warn!(pid, error = %e, "发送终止信号失败");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_signal_terminate_missing_process_is_silent() {
        // 不存在的 pid 不应 panic，也不应返回错误
        signal_terminate(u32::MAX / 2);
    }
}
