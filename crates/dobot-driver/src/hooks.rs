//! 钩子系统（Hook System）
//!
//! 在请求帧写出、应答帧到达时触发自定义回调。
//!
//! # 使用示例
//!
//! ```rust
//! use dobot_driver::hooks::{FrameCallback, HexDumpHook, HookManager};
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! hooks.add_callback(Arc::new(HexDumpHook));
//!
//! hooks.trigger_all_sent(&[0xAA, 0xAA, 0x02, 0x00, 0x00, 0x00]);
//! ```

use std::sync::Arc;
use tracing::trace;

/// 帧回调 Trait
///
/// 回调在执行器持有串口锁时同步调用，实现应当尽快返回，
/// 需要耗时处理时使用 `crossbeam_channel::Sender::try_send` 转交给其他线程。
pub trait FrameCallback: Send + Sync {
    /// 收到应答帧（重组后的完整字节）
    fn on_frame_received(&self, frame: &[u8]);

    /// 请求帧写入成功后调用（可选）
    fn on_frame_sent(&self, frame: &[u8]) {
        let _ = frame;
    }
}

/// 以十六进制在 `trace` 级别记录收发帧
#[derive(Debug, Default, Clone, Copy)]
pub struct HexDumpHook;

impl FrameCallback for HexDumpHook {
    fn on_frame_received(&self, frame: &[u8]) {
        trace!("RX {}", hex::encode_upper(frame));
    }

    fn on_frame_sent(&self, frame: &[u8]) {
        trace!("TX {}", hex::encode_upper(frame));
    }
}

/// 钩子管理器
///
/// 回调列表本身不是线程安全的，执行器通过 `RwLock<HookManager>` 同步。
#[derive(Default)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn FrameCallback>>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add_callback(&mut self, callback: Arc<dyn FrameCallback>) {
        self.callbacks.push(callback);
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn trigger_all(&self, frame: &[u8]) {
        for callback in self.callbacks.iter() {
            callback.on_frame_received(frame);
        }
    }

    pub fn trigger_all_sent(&self, frame: &[u8]) {
        for callback in self.callbacks.iter() {
            callback.on_frame_sent(frame);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Sender, bounded};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct TestCallback {
        tx: Sender<Vec<u8>>,
        count: Arc<AtomicU64>,
    }

    impl FrameCallback for TestCallback {
        fn on_frame_received(&self, frame: &[u8]) {
            let _ = self.tx.try_send(frame.to_vec());
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_hook_manager_add_callback() {
        let mut hooks = HookManager::new();
        assert!(hooks.is_empty());

        let (tx, _rx) = bounded(10);
        let count = Arc::new(AtomicU64::new(0));
        hooks.add_callback(Arc::new(TestCallback { tx, count }));
        hooks.add_callback(Arc::new(HexDumpHook));
        assert_eq!(hooks.len(), 2);
    }

    #[test]
    fn test_hook_manager_trigger_all() {
        let mut hooks = HookManager::new();
        let (tx, rx) = bounded(10);
        let count = Arc::new(AtomicU64::new(0));
        hooks.add_callback(Arc::new(TestCallback {
            tx,
            count: count.clone(),
        }));

        hooks.trigger_all(&[0xAA, 0xAA, 0x02, 0x00, 0x00, 0x00]);

        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(rx.try_recv().unwrap().len(), 6);
    }

    #[test]
    fn test_default_sent_callback_is_noop() {
        let mut hooks = HookManager::new();
        let (tx, rx) = bounded(10);
        let count = Arc::new(AtomicU64::new(0));
        hooks.add_callback(Arc::new(TestCallback {
            tx,
            count: count.clone(),
        }));

        hooks.trigger_all_sent(&[0xAA]);

        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_hook_manager_clear() {
        let mut hooks = HookManager::new();
        hooks.add_callback(Arc::new(HexDumpHook));
        hooks.clear();
        assert!(hooks.is_empty());
    }
}
