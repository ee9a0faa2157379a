//! 执行器性能指标
//!
//! 原子计数器，可以在任何线程读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 执行器实时指标
///
/// ```rust
/// use dobot_driver::DriverMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = DriverMetrics::new();
/// metrics.requests_sent.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().requests_sent, 1);
/// ```
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// 成功写入串口的请求数
    pub requests_sent: AtomicU64,

    /// 成功解析的应答数
    pub responses_ok: AtomicU64,

    /// 超时无应答次数
    pub no_response: AtomicU64,

    /// 应答帧校验失败次数
    pub invalid_responses: AtomicU64,

    /// 应答负载解析失败次数
    pub parse_failures: AtomicU64,

    /// 写入失败次数
    pub send_failures: AtomicU64,

    /// 帧头前被丢弃的噪声字节数
    pub discarded_bytes: AtomicU64,
}

impl DriverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            responses_ok: self.responses_ok.load(Ordering::Relaxed),
            no_response: self.no_response.load(Ordering::Relaxed),
            invalid_responses: self.invalid_responses.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            discarded_bytes: self.discarded_bytes.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.requests_sent.store(0, Ordering::Relaxed);
        self.responses_ok.store(0, Ordering::Relaxed);
        self.no_response.store(0, Ordering::Relaxed);
        self.invalid_responses.store(0, Ordering::Relaxed);
        self.parse_failures.store(0, Ordering::Relaxed);
        self.send_failures.store(0, Ordering::Relaxed);
        self.discarded_bytes.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub responses_ok: u64,
    pub no_response: u64,
    pub invalid_responses: u64,
    pub parse_failures: u64,
    pub send_failures: u64,
    pub discarded_bytes: u64,
}

impl MetricsSnapshot {
    /// 应答成功率（百分比）；没有请求时返回 0.0
    pub fn success_rate(&self) -> f64 {
        if self.requests_sent == 0 {
            return 0.0;
        }
        (self.responses_ok as f64 / self.requests_sent as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = DriverMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate() {
        let metrics = DriverMetrics::new();
        metrics.requests_sent.fetch_add(4, Ordering::Relaxed);
        metrics.responses_ok.fetch_add(3, Ordering::Relaxed);
        metrics.no_response.fetch_add(1, Ordering::Relaxed);
        assert_eq!(metrics.snapshot().success_rate(), 75.0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = DriverMetrics::new();
        metrics.send_failures.fetch_add(5, Ordering::Relaxed);
        metrics.reset();
        assert_eq!(metrics.snapshot().send_failures, 0);
    }

    #[test]
    fn test_metrics_concurrent() {
        let metrics = Arc::new(DriverMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.requests_sent.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().requests_sent, 4000);
    }
}
