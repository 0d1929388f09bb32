use std::path::PathBuf;

use once_cell::sync::Lazy;

use crate::models::OperatingMode;

#[cfg(target_os = "windows")]
const BACKEND_EXECUTABLE_NAME: &str = "backend.exe";
#[cfg(not(target_os = "windows"))]
const BACKEND_EXECUTABLE_NAME: &str = "backend";

/// 应用数据根目录（userData 的等价物），进程内只解析一次
static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    dirs_next::data_dir()
        .map(|dir| dir.join("guanjia"))
        .unwrap_or_else(|| {
            tracing::warn!("无法获取用户数据目录, 回退到当前目录");
            PathBuf::from(".guanjia")
        })
});

/// 打包后资源目录：与可执行文件同级的 resources/
static RESOURCES_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("resources")))
        .unwrap_or_else(|| PathBuf::from("resources"))
});

pub fn data_root() -> &'static PathBuf {
    &DATA_ROOT
}

/// 后端持久化数据目录的默认位置
pub fn default_storage_dir() -> PathBuf {
    data_root().join("data")
}

/// 后端可执行文件的默认位置
pub fn default_backend_executable(mode: OperatingMode) -> PathBuf {
    if mode.is_packaged() {
        RESOURCES_DIR.join(BACKEND_EXECUTABLE_NAME)
    } else {
        // 开发模式：仓库内的后端构建产物
        PathBuf::from("backend/dist").join(BACKEND_EXECUTABLE_NAME)
    }
}

/// 前端静态产物目录的默认位置
pub fn default_frontend_dir(mode: OperatingMode) -> PathBuf {
    if mode.is_packaged() {
        RESOURCES_DIR.join("frontend")
    } else {
        PathBuf::from("frontend/dist")
    }
}
