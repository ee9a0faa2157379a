//! 物理稳定等待
//!
//! 编排流程中的固定等待通过 `Delay` 注入，测试可以换成不等待的实现。

use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

pub trait Delay: Send + Sync {
    fn wait(&self, label: &'static str, duration: Duration);
}

/// 使用 `spin_sleep` 的真实等待
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn wait(&self, label: &'static str, duration: Duration) {
        debug!("Waiting {:?} ({})", duration, label);
        spin_sleep::sleep(duration);
    }
}

/// 立即返回
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn wait(&self, _label: &'static str, _duration: Duration) {}
}

/// 只记录请求的等待，不真正等待
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<(&'static str, Duration)>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<(&'static str, Duration)> {
        self.waits.lock().clone()
    }

    pub fn total(&self) -> Duration {
        self.waits.lock().iter().map(|(_, d)| *d).sum()
    }
}

impl Delay for RecordingDelay {
    fn wait(&self, label: &'static str, duration: Duration) {
        self.waits.lock().push((label, duration));
    }
}
