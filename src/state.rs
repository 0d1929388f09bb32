use serde::Serialize;

/// 应用生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Idle,
    Initializing,
    Ready,
    ShuttingDown,
    Terminated,
}

/// 生命周期阶段的唯一持有者
///
/// 只能通过 advance 沿既定路径迁移：
/// Idle → Initializing → Ready → ShuttingDown → Terminated，
/// 另有 Initializing 直达 Terminated 的致命拆除路径。
#[derive(Debug)]
pub struct LifecycleState {
    phase: LifecyclePhase,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            phase: LifecyclePhase::Idle,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn is(&self, phase: LifecyclePhase) -> bool {
        self.phase == phase
    }

    /// 尝试迁移到下一阶段，非法迁移保持原状并返回 false
    pub fn advance(&mut self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;

        let allowed = matches!(
            (self.phase, next),
            (Idle, Initializing)
                | (Initializing, Ready)
                | (Initializing, ShuttingDown)
                | (Initializing, Terminated)
                | (Ready, ShuttingDown)
                | (ShuttingDown, Terminated)
        );

        if allowed {
            tracing::debug!(from = ?self.phase, to = ?next, "生命周期阶段迁移");
            self.phase = next;
        } else {
            tracing::warn!(from = ?self.phase, to = ?next, "忽略非法的生命周期迁移");
        }
        allowed
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}
