use crate::error::ShellError;
use crate::models::{BridgeCapabilities, PresentationWindow, WindowOptions};

/// 展示层的注入点
///
/// WindowCoordinator 通过这个 trait 操作真实的窗口系统。
/// 渲染侧只拿到 BridgeCapabilities 这一份只读能力面。
pub trait SurfaceBackend {
    fn create(
        &mut self,
        window: &PresentationWindow,
        options: &WindowOptions,
        bridge: &BridgeCapabilities,
    ) -> Result<(), ShellError>;

    fn destroy(&mut self, window: &PresentationWindow);
}

/// 占位后端：只记录窗口的创建与销毁。
/// 实际的 WebView 宿主由外层桌面框架在这个接口上接入。
pub struct NullSurface;

impl SurfaceBackend for NullSurface {
    fn create(
        &mut self,
        window: &PresentationWindow,
        options: &WindowOptions,
        bridge: &BridgeCapabilities,
    ) -> Result<(), ShellError> {
        tracing::info!(
            id = %window.id,
            title = %options.title,
            width = options.width,
            height = options.height,
            content = ?window.content_source,
            version = bridge.get_version(),
            platform = bridge.get_platform(),
            packaged = bridge.is_packaged(),
            "创建展示窗口"
        );
        Ok(())
    }

    fn destroy(&mut self, window: &PresentationWindow) {
        tracing::info!(id = %window.id, "销毁展示窗口");
    }
}
