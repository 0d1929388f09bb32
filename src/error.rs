use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 壳层错误分类
///
/// Initializing 阶段的错误全部是致命的（应用以非零状态退出），
/// Ready 之后的故障只记录日志、不再向上传播。
#[derive(Debug, Error)]
pub enum ShellError {
    /// 后端可执行文件无法启动（文件不存在、无执行权限等）
    #[error("启动后端进程失败 {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 存储目录创建失败（spawn 之前的前置步骤）
    #[error("创建存储目录失败 {path}: {source}")]
    StorageDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 已有一个后端进程在运行（单实例约束）
    #[error("后端进程已在运行 (pid={pid})")]
    AlreadyRunning { pid: u32 },

    /// 重试次数耗尽，后端始终不可达
    #[error("后端未就绪：已尝试 {attempts} 次")]
    BackendNotReady { attempts: u32 },

    /// 窗口创建失败
    #[error("创建窗口失败: {0}")]
    WindowCreation(String),

    /// 配置文件读取或解析失败
    #[error("加载配置失败 {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Initializing 关键路径上的未捕获错误
    #[error("初始化阶段未捕获错误: {0}")]
    Runtime(String),
}
