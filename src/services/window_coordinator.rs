use crate::error::ShellError;
use crate::models::{BridgeCapabilities, ContentSource, PresentationWindow, WindowOptions};
use crate::services::surface::SurfaceBackend;

/// 展示窗口的唯一持有者
///
/// 同一时刻最多一个窗口；创建只发生在就绪探测成功之后
/// （由 LifecycleController 保证调用时序）。
pub struct WindowCoordinator<S: SurfaceBackend> {
    backend: S,
    options: WindowOptions,
    bridge: BridgeCapabilities,
    window: Option<PresentationWindow>,
}

impl<S: SurfaceBackend> WindowCoordinator<S> {
    pub fn new(backend: S, options: WindowOptions, bridge: BridgeCapabilities) -> Self {
        Self {
            backend,
            options,
            bridge,
            window: None,
        }
    }

    /// 创建展示窗口。已有窗口时保持单实例不动
    pub fn create_window(&mut self, content_source: ContentSource) -> Result<(), ShellError> {
        if let Some(existing) = &self.window {
            tracing::warn!(id = %existing.id, "窗口已存在, 跳过创建");
            return Ok(());
        }

        let window = PresentationWindow::new(content_source);
        self.backend.create(&window, &self.options, &self.bridge)?;
        tracing::info!(id = %window.id, "展示窗口已创建");
        self.window = Some(window);
        Ok(())
    }

    /// 用户关闭窗口后清理持有的引用
    pub fn destroy_window(&mut self) {
        if let Some(window) = self.window.take() {
            self.backend.destroy(&window);
            tracing::info!(id = %window.id, "展示窗口已销毁");
        }
    }

    /// 重新激活：仅在零窗口时重建
    pub fn recreate_if_none(&mut self, content_source: ContentSource) -> Result<(), ShellError> {
        if self.window.is_none() {
            self.create_window(content_source)
        } else {
            Ok(())
        }
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }
}
