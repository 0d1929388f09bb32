use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ShellError;

/// 单次 poll 的重试预算，每次调用新建一份
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
    pub attempt_timeout_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_attempts: 60,
            attempt_timeout_ms: 1000,
        }
    }
}

impl ProbeSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// 单次探测失败的原因，只进 debug 日志，不向外传播
enum ProbeAttemptFailure {
    Status(u16),
    Transport(reqwest::Error),
}

impl fmt::Display for ProbeAttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeAttemptFailure::Status(code) => write!(f, "状态码 {}", code),
            ProbeAttemptFailure::Transport(e) => write!(f, "请求失败: {}", e),
        }
    }
}

/// 就绪探测：固定间隔轮询健康端点，直到后端可达或预算耗尽
///
/// 探测严格串行，同一时刻只有一个在途请求；每次尝试带独立超时。
/// 固定间隔而非指数退避，最坏总等待时间有界：
/// max_attempts × (attempt_timeout + interval)。
pub struct ReadinessProbe {
    client: reqwest::Client,
}

impl ReadinessProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// 轮询直到 200，返回成功时的尝试序号（从 1 计）。
    /// 预算耗尽返回 BackendNotReady；最后一次失败后不再等待间隔。
    pub async fn poll(&self, url: &str, settings: &ProbeSettings) -> Result<u32, ShellError> {
        for attempt in 1..=settings.max_attempts {
            match self.attempt(url, settings).await {
                Ok(()) => {
                    tracing::info!(attempt, url, "后端已就绪");
                    return Ok(attempt);
                }
                Err(failure) => {
                    tracing::debug!(
                        attempt,
                        max_attempts = settings.max_attempts,
                        reason = %failure,
                        "健康检查未通过"
                    );
                }
            }

            if attempt < settings.max_attempts {
                tokio::time::sleep(settings.interval()).await;
            }
        }

        Err(ShellError::BackendNotReady {
            attempts: settings.max_attempts,
        })
    }

    /// 单次探测：仅 200 视为成功，其余状态码与传输错误一律算失败
    async fn attempt(&self, url: &str, settings: &ProbeSettings) -> Result<(), ProbeAttemptFailure> {
        let response = self
            .client
            .get(url)
            .timeout(settings.attempt_timeout())
            .send()
            .await
            .map_err(ProbeAttemptFailure::Transport)?;

        if response.status() == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(ProbeAttemptFailure::Status(response.status().as_u16()))
        }
    }
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::new()
    }
}
