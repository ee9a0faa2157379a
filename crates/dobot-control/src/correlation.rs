//! 请求/应答关联表
//!
//! 每个在途请求分配一个严格递增的 id，应答方凭 id 完成请求。
//! 等待超时或请求被丢弃时条目会被移除，迟到的应答只会返回 `false`。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 关联层错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("Request {id} timed out after {timeout_ms}ms")]
    Timeout { id: u64, timeout_ms: u64 },
}

struct Inner<T> {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Sender<T>>>,
}

/// 通用关联表
///
/// 克隆后共享同一张表，可以在等待方和应答方之间传递。
pub struct Correlator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Correlator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Correlator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Correlator<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// 登记一个新请求
    pub fn register(&self) -> PendingRequest<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = bounded(1);
        self.inner.pending.lock().insert(id, tx);
        PendingRequest {
            id,
            rx,
            correlator: self.clone(),
        }
    }

    /// 完成请求
    ///
    /// 返回 `false` 表示 id 未知或已过期，值被丢弃。
    pub fn complete(&self, id: u64, value: T) -> bool {
        let Some(tx) = self.inner.pending.lock().remove(&id) else {
            debug!("Discarding completion for unknown or expired request {}", id);
            return false;
        };
        tx.send(value).is_ok()
    }

    /// 取消请求（不完成）
    pub fn cancel(&self, id: u64) -> bool {
        self.inner.pending.lock().remove(&id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.inner.pending.lock().contains_key(&id)
    }
}

/// 在途请求
///
/// 被丢弃时自动从关联表注销。
pub struct PendingRequest<T> {
    id: u64,
    rx: Receiver<T>,
    correlator: Correlator<T>,
}

impl<T> PendingRequest<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 阻塞当前线程直到完成或超时
    ///
    /// `complete` 返回 `true` 的值一定会被这里收到，即使它与超时同时发生。
    pub fn wait(self, timeout: Duration) -> Result<T, CorrelationError> {
        let timed_out = CorrelationError::Timeout {
            id: self.id,
            timeout_ms: timeout.as_millis() as u64,
        };
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            // 条目已被 complete 取走：发送端即将送达或被丢弃
            Err(RecvTimeoutError::Timeout) if !self.correlator.cancel(self.id) => {
                self.rx.recv().map_err(|_| timed_out)
            },
            Err(_) => Err(timed_out),
        }
    }
}

impl<T> Drop for PendingRequest<T> {
    fn drop(&mut self) {
        self.correlator.cancel(self.id);
    }
}

impl<T> std::fmt::Debug for PendingRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest").field("id", &self.id).finish()
    }
}
