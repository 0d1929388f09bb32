use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::models::OperatingMode;

/// 展示窗口记录
///
/// 由 WindowCoordinator 独占持有，同一时刻最多存在一个实例。
#[derive(Debug, Clone, Serialize)]
pub struct PresentationWindow {
    pub id: Uuid,
    pub visible: bool,
    pub content_source: ContentSource,
}

impl PresentationWindow {
    pub fn new(content_source: ContentSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            visible: true,
            content_source,
        }
    }
}

/// 窗口内容来源：打包模式加载本地前端产物，开发模式加载本地开发服务器
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    LocalBundle(PathBuf),
    DevServer(String),
}

impl ContentSource {
    /// 按运行模式解析内容来源
    pub fn resolve(mode: OperatingMode, frontend_dir: &Path, dev_server_url: &str) -> Self {
        if mode.is_packaged() {
            ContentSource::LocalBundle(frontend_dir.join("index.html"))
        } else {
            ContentSource::DevServer(dev_server_url.to_string())
        }
    }
}

/// 窗口几何与标题
#[derive(Debug, Clone, Serialize)]
pub struct WindowOptions {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub title: String,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            min_width: 800,
            min_height: 600,
            title: "屁管家".to_string(),
        }
    }
}

/// 暴露给窗口内容的能力面
///
/// 只读、显式枚举的三个能力，此外什么都不给：渲染侧拿不到
/// supervisor、文件系统或后端进程句柄。
#[derive(Debug, Clone, Serialize)]
pub struct BridgeCapabilities {
    version: String,
    platform: String,
    packaged: bool,
}

impl BridgeCapabilities {
    pub fn new(mode: OperatingMode) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            packaged: mode.is_packaged(),
        }
    }

    pub fn get_version(&self) -> &str {
        &self.version
    }

    pub fn get_platform(&self) -> &str {
        &self.platform
    }

    pub fn is_packaged(&self) -> bool {
        self.packaged
    }
}
