use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 后端进程句柄
///
/// 由 ProcessSupervisor 独占持有，其他组件只能通过 supervisor 的
/// 只读访问器观察它。状态迁移见各 mark_* 方法。
#[derive(Debug, Clone, Serialize)]
pub struct ServiceProcessHandle {
    pub pid: Option<u32>,
    pub state: ProcessState,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    NotStarted,
    Starting,
    Running,
    Exited,
    Failed,
}

impl ServiceProcessHandle {
    pub fn new() -> Self {
        Self {
            pid: None,
            state: ProcessState::NotStarted,
            exit_code: None,
            started_at: None,
        }
    }

    /// Starting 或 Running 都算活跃（单实例约束的判定条件）
    pub fn is_active(&self) -> bool {
        matches!(self.state, ProcessState::Starting | ProcessState::Running)
    }

    pub fn mark_starting(&mut self) {
        self.state = ProcessState::Starting;
        self.exit_code = None;
    }

    /// 操作系统确认进程创建成功后进入 Running
    pub fn mark_running(&mut self, pid: u32) {
        self.pid = Some(pid);
        self.state = ProcessState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self) {
        self.pid = None;
        self.state = ProcessState::Failed;
    }

    /// 进程退出：记录退出码并清空 pid 引用
    pub fn mark_exited(&mut self, code: Option<i32>) {
        self.pid = None;
        self.state = ProcessState::Exited;
        self.exit_code = code;
    }

    /// 取走 Running 状态下的 pid，用于发送终止信号。
    /// 只会成功一次，保证重复 terminate 是静默空操作。
    pub fn take_running_pid(&mut self) -> Option<u32> {
        if self.state == ProcessState::Running {
            self.pid.take()
        } else {
            None
        }
    }
}

impl Default for ServiceProcessHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// 运行模式：打包（生产）与未打包（开发）决定资源解析策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    Production,
    Development,
}

impl OperatingMode {
    pub fn is_packaged(&self) -> bool {
        matches!(self, OperatingMode::Production)
    }

    /// 传给后端进程环境变量的取值
    pub fn as_env_str(&self) -> &'static str {
        match self {
            OperatingMode::Production => "production",
            OperatingMode::Development => "development",
        }
    }
}

/// 传给后端的凭据材料。两段独立的密钥（应用密钥 + 令牌签名密钥）。
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceSecrets {
    pub secret_key: String,
    pub jwt_secret_key: String,
}

// 凭据不进日志：Debug 输出一律脱敏
impl fmt::Debug for ServiceSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSecrets")
            .field("secret_key", &"***")
            .field("jwt_secret_key", &"***")
            .finish()
    }
}

/// spawn 时的启动配置
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// 后端持久化数据目录，spawn 前保证存在（含所有缺失的上级目录）
    pub storage_path: PathBuf,
    pub secrets: ServiceSecrets,
    pub operating_mode: OperatingMode,
}
