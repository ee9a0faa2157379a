//! 指令执行器
//!
//! 把 `Command` 编码成帧写入串口，在超时内读取并重组应答，
//! 校验后交给指令自身解析。同一时刻链路上只有一个在途请求：
//! 写入和读取在同一次加锁内完成。

use crate::error::DriverError;
use crate::hooks::{FrameCallback, HookManager};
use crate::metrics::DriverMetrics;
use dobot_protocol::{
    Command, CommandId, DEFAULT_RESPONSE_TIMEOUT_MS, HEADER, ProtocolError, Response, find_header,
    frame_len, validate,
};
use dobot_serial::{PortSpec, Transport};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 指令执行器
pub struct CommandExecutor {
    transport: Mutex<Box<dyn Transport>>,
    response_timeout: Duration,
    hooks: RwLock<HookManager>,
    metrics: Arc<DriverMetrics>,
}

impl CommandExecutor {
    /// 包装一个传输（不负责打开）
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Mutex::new(Box::new(transport)),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            hooks: RwLock::new(HookManager::new()),
            metrics: Arc::new(DriverMetrics::new()),
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn connect(&self, spec: &PortSpec) -> Result<(), DriverError> {
        self.transport.lock().open(spec)?;
        Ok(())
    }

    pub fn disconnect(&self) {
        self.transport.lock().close();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.lock().is_open()
    }

    pub fn metrics(&self) -> &Arc<DriverMetrics> {
        &self.metrics
    }

    pub fn add_hook(&self, callback: Arc<dyn FrameCallback>) {
        self.hooks.write().add_callback(callback);
    }

    /// 发送指令并等待应答
    pub fn execute(&self, command: &Command) -> Result<Response, DriverError> {
        let id = command.command_id();
        let request = command.encode().map_err(DriverError::InvalidRequest)?;

        let raw = {
            let mut transport = self.transport.lock();
            if !transport.is_open() {
                return Err(DriverError::NotConnected);
            }

            // 丢弃上一次请求残留的迟到应答
            if let Err(e) = transport.clear_input() {
                warn!("Failed to clear input before {}: {}", id, e);
            }

            if let Err(e) = transport.write(&request) {
                self.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
                return Err(DriverError::SendFailed(e));
            }
            self.metrics.requests_sent.fetch_add(1, Ordering::Relaxed);
            self.hooks.read().trigger_all_sent(&request);
            debug!("Sent {} ({} bytes)", id, request.len());

            self.read_response(&mut **transport, id)?
        };
        self.hooks.read().trigger_all(&raw);

        let payload = validate(&raw, id.code()).map_err(|e| {
            self.metrics.invalid_responses.fetch_add(1, Ordering::Relaxed);
            DriverError::InvalidResponse(e)
        })?;
        let response = command.parse_response(payload).map_err(|e| {
            self.metrics.parse_failures.fetch_add(1, Ordering::Relaxed);
            DriverError::ParseFailure(e)
        })?;

        self.metrics.responses_ok.fetch_add(1, Ordering::Relaxed);
        debug!("{} -> {:?}", id, response);
        Ok(response)
    }

    /// 执行写指令，忽略应答内容
    pub fn execute_unit(&self, command: &Command) -> Result<(), DriverError> {
        self.execute(command).map(|_| ())
    }

    /// 在截止时间前读取一帧
    ///
    /// 帧头前的字节被丢弃。候选帧不完整或无效时继续尝试后面的帧头
    /// （噪声末尾可能是 `0xAA`）。截止时仍没有有效帧，返回第一个候选帧，
    /// 由校验报告具体错误。
    fn read_response(
        &self,
        transport: &mut dyn Transport,
        id: CommandId,
    ) -> Result<Vec<u8>, DriverError> {
        let deadline = Instant::now() + self.response_timeout;
        let mut buf: Vec<u8> = Vec::new();

        loop {
            self.discard_noise(&mut buf);

            match scan_frames(&buf, id.code()) {
                Scan::Valid { start, len } => {
                    self.discard(&mut buf, start);
                    buf.truncate(len);
                    return Ok(buf);
                },
                Scan::Rejected => {
                    if let Some(len) = frame_len(&buf) {
                        buf.truncate(len);
                    }
                    return Ok(buf);
                },
                Scan::Pending => {},
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let chunk = transport.read_with_timeout(deadline - now)?;
            buf.extend_from_slice(&chunk);
        }

        if buf.is_empty() {
            self.metrics.no_response.fetch_add(1, Ordering::Relaxed);
            warn!("No response to {}", id);
            return Err(DriverError::NoResponse {
                command: id,
                timeout_ms: self.response_timeout.as_millis() as u64,
            });
        }
        if let Some(len) = frame_len(&buf) {
            buf.truncate(len);
        }
        Ok(buf)
    }

    fn discard_noise(&self, buf: &mut Vec<u8>) {
        let keep_from = match find_header(buf) {
            Some(start) => start,
            // 末尾单个 0xAA 可能是下一个帧头的前半
            None if buf.last() == Some(&HEADER[0]) => buf.len() - 1,
            None => buf.len(),
        };
        self.discard(buf, keep_from);
    }

    fn discard(&self, buf: &mut Vec<u8>, count: usize) {
        if count > 0 {
            self.metrics
                .discarded_bytes
                .fetch_add(count as u64, Ordering::Relaxed);
            debug!("Discarding {} bytes before frame header", count);
            buf.drain(..count);
        }
    }
}

/// 缓冲区扫描结果
#[derive(Debug, PartialEq, Eq)]
enum Scan {
    /// 从 `start` 开始的 `len` 字节是期望指令的有效应答
    Valid { start: usize, len: usize },
    /// 所有候选帧都已完整到达且无效
    Rejected,
    /// 还有候选帧在等待更多字节
    Pending,
}

/// 依次尝试每个帧头位置
fn scan_frames(buf: &[u8], expected_code: u8) -> Scan {
    let mut rejected = false;
    let mut pending = buf.last() == Some(&HEADER[0]);

    for start in 0..buf.len() {
        let candidate = &buf[start..];
        if !candidate.starts_with(&HEADER) {
            continue;
        }
        match frame_len(candidate) {
            Some(len) if candidate.len() >= len => {
                match validate(&candidate[..len], expected_code) {
                    Ok(_) => return Scan::Valid { start, len },
                    // 其他指令的迟到应答，本次应答可能还在路上
                    Err(ProtocolError::UnexpectedCommand { .. }) => pending = true,
                    Err(_) => rejected = true,
                }
            },
            _ => pending = true,
        }
    }

    if rejected && !pending {
        Scan::Rejected
    } else {
        Scan::Pending
    }
}

impl Drop for CommandExecutor {
    fn drop(&mut self) {
        self.transport.get_mut().close();
    }
}
