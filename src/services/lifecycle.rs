use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::ShellError;
use crate::models::{BackgroundPolicy, ContentSource, LifecycleEvent};
use crate::services::process_supervisor::ProcessSupervisor;
use crate::services::readiness_probe::ReadinessProbe;
use crate::services::shell_config::ShellConfig;
use crate::services::surface::SurfaceBackend;
use crate::services::window_coordinator::WindowCoordinator;
use crate::state::{LifecyclePhase, LifecycleState};

/// 初始化关键路径的结果
enum InitOutcome {
    /// 后端就绪、窗口已创建
    Ready,
    /// 初始化期间收到退出请求，已完成拆除
    Aborted,
}

/// 探测与事件通道竞争的胜出方
enum ProbeWait {
    Done(Result<u32, ShellError>),
    Quit,
}

/// 顶层生命周期控制器
///
/// 把应用级事件接到 supervisor / probe / coordinator 三个组件上：
/// Idle → Initializing → Ready → ShuttingDown → Terminated。
/// 关停路径只会走一次，terminate 本身幂等。
pub struct LifecycleController<S: SurfaceBackend> {
    state: LifecycleState,
    config: ShellConfig,
    supervisor: ProcessSupervisor,
    probe: ReadinessProbe,
    coordinator: WindowCoordinator<S>,
    events: UnboundedReceiver<LifecycleEvent>,
}

impl<S: SurfaceBackend> LifecycleController<S> {
    pub fn new(
        config: ShellConfig,
        supervisor: ProcessSupervisor,
        probe: ReadinessProbe,
        coordinator: WindowCoordinator<S>,
        events: UnboundedReceiver<LifecycleEvent>,
    ) -> Self {
        Self {
            state: LifecycleState::new(),
            config,
            supervisor,
            probe,
            coordinator,
            events,
        }
    }

    /// 事件主循环。正常关停返回 Ok，初始化关键路径失败返回 Err
    /// （调用方以非零状态退出进程）。
    pub async fn run(mut self) -> Result<(), ShellError> {
        while let Some(event) = self.events.recv().await {
            match event {
                LifecycleEvent::Startup => {
                    if !self.state.is(LifecyclePhase::Idle) {
                        tracing::warn!(phase = ?self.state.phase(), "忽略重复的启动事件");
                        continue;
                    }
                    match self.initialize().await {
                        Ok(InitOutcome::Ready) => {}
                        Ok(InitOutcome::Aborted) => return Ok(()),
                        Err(e) => return self.fatal_teardown(e),
                    }
                }

                LifecycleEvent::Reactivate => {
                    if self.state.is(LifecyclePhase::Ready) {
                        let source = self.content_source();
                        // Ready 之后的窗口故障只降级，不拆应用
                        if let Err(e) = self.coordinator.recreate_if_none(source) {
                            tracing::error!(error = %e, "重新创建窗口失败");
                        }
                    }
                }

                LifecycleEvent::WindowClosed => {
                    if !self.state.is(LifecyclePhase::Ready) {
                        continue;
                    }
                    self.coordinator.destroy_window();
                    if !self.coordinator.has_window() {
                        match self.config.background_policy {
                            BackgroundPolicy::ExitOnLastWindowClosed => {
                                self.shutdown();
                                return Ok(());
                            }
                            BackgroundPolicy::StayResident => {
                                tracing::info!("所有窗口已关闭, 保持后台常驻");
                            }
                        }
                    }
                }

                LifecycleEvent::QuitRequested => match self.state.phase() {
                    LifecyclePhase::Ready => {
                        self.shutdown();
                        return Ok(());
                    }
                    // 尚未启动就退出：无进程可终止
                    LifecyclePhase::Idle => return Ok(()),
                    other => {
                        tracing::debug!(phase = ?other, "忽略退出请求");
                    }
                },

                LifecycleEvent::BackendExited { code } => {
                    self.supervisor.observe_exit(code);
                }

                LifecycleEvent::RuntimeError { message } => {
                    // Ready 之后的未捕获错误吞掉，避免拖垮界面
                    tracing::error!(%message, "未捕获错误");
                }
            }
        }

        // 事件通道关闭等同于退出请求
        if self.state.is(LifecyclePhase::Ready) {
            self.shutdown();
        }
        Ok(())
    }

    /// 初始化关键路径：spawn → 就绪探测 → 创建窗口。
    /// 任何一步失败都向上返回错误触发致命拆除；
    /// 探测期间仍然消费事件通道，退出请求会立即中止探测。
    async fn initialize(&mut self) -> Result<InitOutcome, ShellError> {
        self.state.advance(LifecyclePhase::Initializing);

        let spawn_config = self.config.spawn_config();
        self.supervisor
            .spawn(&self.config.backend_executable, &spawn_config)?;

        let health_url = self.config.health_url();
        tracing::info!(url = %health_url, "等待后端就绪");

        let outcome = {
            let probe_fut = self.probe.poll(&health_url, &self.config.probe);
            tokio::pin!(probe_fut);
            loop {
                tokio::select! {
                    result = &mut probe_fut => break ProbeWait::Done(result),
                    event = self.events.recv() => match event {
                        Some(LifecycleEvent::QuitRequested) | None => break ProbeWait::Quit,
                        Some(LifecycleEvent::BackendExited { code }) => {
                            // 后端中途退出：记录状态，探测继续直到预算耗尽
                            self.supervisor.observe_exit(code);
                        }
                        Some(LifecycleEvent::RuntimeError { message }) => {
                            // 关键路径上的未捕获错误是致命的
                            break ProbeWait::Done(Err(ShellError::Runtime(message)));
                        }
                        Some(other) => {
                            tracing::debug!(event = ?other, "初始化期间忽略事件");
                        }
                    }
                }
            }
            // 离开作用域即丢弃探测 future，在途请求与计时器随之取消
        };

        match outcome {
            ProbeWait::Quit => {
                tracing::info!("初始化期间收到退出请求, 中止启动");
                self.shutdown();
                Ok(InitOutcome::Aborted)
            }
            ProbeWait::Done(Err(e)) => Err(e),
            ProbeWait::Done(Ok(attempt)) => {
                // 窗口创建严格晚于探测成功，事件并发到达也不会乱序
                self.coordinator.create_window(self.content_source())?;
                self.state.advance(LifecyclePhase::Ready);
                tracing::info!(attempt, "后端就绪, 应用进入 Ready");
                Ok(InitOutcome::Ready)
            }
        }
    }

    /// 有序关停：ShuttingDown → terminate → Terminated
    fn shutdown(&mut self) {
        self.state.advance(LifecyclePhase::ShuttingDown);
        self.supervisor.terminate();
        self.state.advance(LifecyclePhase::Terminated);
        tracing::info!("应用已终止");
    }

    /// 致命拆除：终止后端（spawn 未完成时也安全）并带错误退出，
    /// 永远不会走到窗口创建。
    fn fatal_teardown(&mut self, error: ShellError) -> Result<(), ShellError> {
        tracing::error!(error = %error, "初始化失败, 执行致命拆除");
        self.supervisor.terminate();
        self.state.advance(LifecyclePhase::Terminated);
        Err(error)
    }

    fn content_source(&self) -> ContentSource {
        ContentSource::resolve(
            self.config.operating_mode,
            &self.config.frontend_dir,
            &self.config.dev_server_url,
        )
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::UnboundedSender;

    use super::*;
    use crate::models::{
        BridgeCapabilities, OperatingMode, PresentationWindow, ServiceSecrets, WindowOptions,
    };
    use crate::services::readiness_probe::ProbeSettings;

    /// 共享计数的假展示层：断言发生在 run 返回之后
    #[derive(Clone, Default)]
    struct SharedSurface {
        created_at: Arc<Mutex<Vec<Instant>>>,
        destroyed: Arc<Mutex<usize>>,
    }

    impl SurfaceBackend for SharedSurface {
        fn create(
            &mut self,
            _window: &PresentationWindow,
            _options: &WindowOptions,
            _bridge: &BridgeCapabilities,
        ) -> Result<(), ShellError> {
            self.created_at.lock().unwrap().push(Instant::now());
            Ok(())
        }

        fn destroy(&mut self, _window: &PresentationWindow) {
            *self.destroyed.lock().unwrap() += 1;
        }
    }

    impl SharedSurface {
        fn created(&self) -> usize {
            self.created_at.lock().unwrap().len()
        }
    }

    struct HealthServer {
        base_url: String,
        hits: Arc<AtomicUsize>,
        /// 第一次返回 200 的时刻
        ok_at: Arc<Mutex<Option<Instant>>>,
    }

    /// 前 ok_from-1 次请求返回 fail_status，之后 200
    async fn spawn_health_server(ok_from: usize, fail_status: u16) -> HealthServer {
        let hits = Arc::new(AtomicUsize::new(0));
        let ok_at = Arc::new(Mutex::new(None));
        let counter = hits.clone();
        let stamp = ok_at.clone();

        let app = Router::new().route(
            "/api/health",
            get(move || {
                let counter = counter.clone();
                let stamp = stamp.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n >= ok_from {
                        stamp.lock().unwrap().get_or_insert_with(Instant::now);
                        StatusCode::OK
                    } else {
                        StatusCode::from_u16(fail_status).unwrap()
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HealthServer {
            base_url: format!("http://{}", addr),
            hits,
            ok_at,
        }
    }

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("backend.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn test_config(
        backend_executable: PathBuf,
        storage_path: PathBuf,
        base_url: String,
        probe: ProbeSettings,
        background_policy: BackgroundPolicy,
    ) -> ShellConfig {
        ShellConfig {
            operating_mode: OperatingMode::Development,
            backend_executable,
            storage_path,
            secrets: ServiceSecrets {
                secret_key: "test-secret".to_string(),
                jwt_secret_key: "test-jwt-secret".to_string(),
            },
            base_url,
            dev_server_url: "http://localhost:5173".to_string(),
            frontend_dir: PathBuf::from("frontend/dist"),
            probe,
            background_policy,
        }
    }

    fn fast_probe(max_attempts: u32) -> ProbeSettings {
        ProbeSettings {
            interval_ms: 50,
            max_attempts,
            attempt_timeout_ms: 1000,
        }
    }

    /// 组装控制器并送入 Startup 事件，返回运行句柄与事件发送端
    fn launch(
        config: ShellConfig,
        surface: SharedSurface,
    ) -> (
        tokio::task::JoinHandle<Result<(), ShellError>>,
        UnboundedSender<LifecycleEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = ProcessSupervisor::new(tx.clone());
        let probe = ReadinessProbe::new();
        let coordinator = WindowCoordinator::new(
            surface,
            WindowOptions::default(),
            BridgeCapabilities::new(config.operating_mode),
        );
        let controller = LifecycleController::new(config, supervisor, probe, coordinator, rx);

        tx.send(LifecycleEvent::Startup).unwrap();
        (tokio::spawn(controller.run()), tx)
    }

    async fn wait_until(mut predicate: impl FnMut() -> bool) {
        for _ in 0..200 {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("等待条件超时");
    }

    #[tokio::test]
    async fn test_startup_creates_window_strictly_after_probe_success() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 30");
        // 前 3 次 503，第 4 次 200
        let server = spawn_health_server(4, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            ProbeSettings {
                interval_ms: 100,
                max_attempts: 5,
                attempt_timeout_ms: 1000,
            },
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, tx) = launch(config, surface.clone());

        wait_until(|| surface.created() == 1).await;
        assert_eq!(server.hits.load(Ordering::SeqCst), 4);

        // 窗口创建时间严格晚于探测成功时间
        let ok_at = server.ok_at.lock().unwrap().unwrap();
        let created_at = surface.created_at.lock().unwrap()[0];
        assert!(created_at > ok_at);

        tx.send(LifecycleEvent::QuitRequested).unwrap();
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        // 端点一请求就 200，但 spawn 失败后不应有任何探测
        let server = spawn_health_server(1, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            PathBuf::from("/nonexistent/backend"),
            dir.path().join("data"),
            server.base_url.clone(),
            fast_probe(5),
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, _tx) = launch(config, surface.clone());
        let err = run.await.unwrap().unwrap_err();

        assert!(matches!(err, ShellError::Spawn { .. }));
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
        assert_eq!(surface.created(), 0);
    }

    #[tokio::test]
    async fn test_probe_exhaustion_is_fatal_before_any_window() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 30");
        // 永远 500
        let server = spawn_health_server(usize::MAX, 500).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            ProbeSettings {
                interval_ms: 10,
                max_attempts: 5,
                attempt_timeout_ms: 1000,
            },
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, _tx) = launch(config, surface.clone());
        let err = run.await.unwrap().unwrap_err();

        match err {
            ShellError::BackendNotReady { attempts } => assert_eq!(attempts, 5),
            other => panic!("意外的错误类型: {:?}", other),
        }
        assert_eq!(server.hits.load(Ordering::SeqCst), 5);
        assert_eq!(surface.created(), 0);
    }

    #[tokio::test]
    async fn test_quit_during_probe_aborts_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 30");
        // 永远 503，预算大到测试内不可能耗尽
        let server = spawn_health_server(usize::MAX, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            fast_probe(10_000),
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, tx) = launch(config, surface.clone());

        // 等到探测确实开始再请求退出
        wait_until(|| server.hits.load(Ordering::SeqCst) >= 2).await;
        tx.send(LifecycleEvent::QuitRequested).unwrap();

        // 退出请求中止探测：正常返回且从未创建窗口
        run.await.unwrap().unwrap();
        assert_eq!(surface.created(), 0);

        // 探测已被取消，不再产生新请求
        let settled = server.hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(server.hits.load(Ordering::SeqCst) <= settled + 1);
    }

    #[tokio::test]
    async fn test_window_close_exits_under_exit_policy() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 30");
        let server = spawn_health_server(1, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            fast_probe(5),
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, tx) = launch(config, surface.clone());
        wait_until(|| surface.created() == 1).await;

        tx.send(LifecycleEvent::WindowClosed).unwrap();
        run.await.unwrap().unwrap();
        assert_eq!(*surface.destroyed.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_window_close_stays_resident_and_reactivates() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 30");
        let server = spawn_health_server(1, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            fast_probe(5),
            BackgroundPolicy::StayResident,
        );

        let (run, tx) = launch(config, surface.clone());
        wait_until(|| surface.created() == 1).await;

        // 常驻策略：窗口关闭后应用仍在运行
        tx.send(LifecycleEvent::WindowClosed).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!run.is_finished());

        // 重新激活在零窗口时重建
        tx.send(LifecycleEvent::Reactivate).unwrap();
        wait_until(|| surface.created() == 2).await;

        tx.send(LifecycleEvent::QuitRequested).unwrap();
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_runtime_error_is_fatal_during_initializing() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 30");
        let server = spawn_health_server(usize::MAX, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            fast_probe(10_000),
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, tx) = launch(config, surface.clone());
        wait_until(|| server.hits.load(Ordering::SeqCst) >= 1).await;

        tx.send(LifecycleEvent::RuntimeError {
            message: "初始化期间的模拟错误".to_string(),
        })
        .unwrap();

        let err = run.await.unwrap().unwrap_err();
        assert!(matches!(err, ShellError::Runtime(_)));
        assert_eq!(surface.created(), 0);
    }

    #[tokio::test]
    async fn test_runtime_error_swallowed_after_ready() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 30");
        let server = spawn_health_server(1, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            fast_probe(5),
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, tx) = launch(config, surface.clone());
        wait_until(|| surface.created() == 1).await;

        tx.send(LifecycleEvent::RuntimeError {
            message: "Ready 之后的模拟错误".to_string(),
        })
        .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!run.is_finished());

        tx.send(LifecycleEvent::QuitRequested).unwrap();
        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_backend_exit_after_ready_degrades_without_restart() {
        let dir = tempfile::tempdir().unwrap();
        // 后端在就绪后很快自行退出
        let script = write_script(dir.path(), "sleep 1");
        let server = spawn_health_server(1, 503).await;
        let surface = SharedSurface::default();

        let config = test_config(
            script,
            dir.path().join("data"),
            server.base_url.clone(),
            fast_probe(5),
            BackgroundPolicy::ExitOnLastWindowClosed,
        );

        let (run, tx) = launch(config, surface.clone());
        wait_until(|| surface.created() == 1).await;

        // 后端退出后应用保持运行（降级状态），窗口不动
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!run.is_finished());
        assert_eq!(surface.created(), 1);

        tx.send(LifecycleEvent::QuitRequested).unwrap();
        run.await.unwrap().unwrap();
    }
}
