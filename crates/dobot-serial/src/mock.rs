//! 模拟 Dobot 设备
//!
//! 在内存中解码请求帧、记录指令、更新设备状态并生成应答帧。
//! `MockDobot` 可以克隆：一个句柄交给执行器作为 `Transport`，
//! 另一个留在测试里检查收到的指令或注入故障。

use crate::{PortSpec, Transport, TransportError};
use dobot_protocol::{
    Command, Frame, LiftParams, MovementProfile, Position, Response, encode,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// 无数据时单次读取的最长等待
const IDLE_POLL: Duration = Duration::from_millis(2);

/// 模拟设备的可观察状态
#[derive(Debug, Clone, PartialEq)]
pub struct MockState {
    pub serial_number: String,
    pub device_name: String,
    pub home: Position,
    pub profile: MovementProfile,
    pub lift: LiftParams,
    pub suction: bool,
    pub queue_running: bool,
    /// 最近一次 PTP 目标
    pub pose: Position,
    /// 设备内部队列索引
    pub queue_index: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            serial_number: "DT-MOCK-0001".to_string(),
            device_name: "Dobot Magician".to_string(),
            home: Position::default(),
            profile: MovementProfile::uniform(100.0),
            lift: LiftParams::new(20.0, 100.0),
            suction: false,
            queue_running: false,
            pose: Position::default(),
            queue_index: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: MockState,
    open: bool,
    rx: VecDeque<u8>,
    log: Vec<Command>,
    /// 接下来 N 个请求不应答
    silent: usize,
    /// 接下来 N 个应答破坏校验和
    corrupt: usize,
    /// 接下来 N 个写操作失败
    fail_writes: usize,
    /// 每次读取最多返回的字节数
    chunk_size: Option<usize>,
    /// 下一次应答前插入的噪声
    noise: Vec<u8>,
}

/// 模拟设备句柄
#[derive(Debug, Clone, Default)]
pub struct MockDobot {
    inner: Arc<Mutex<Inner>>,
}

impl MockDobot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定状态创建
    pub fn with_state(state: MockState) -> Self {
        let mock = Self::default();
        mock.inner.lock().state = state;
        mock
    }

    pub fn state(&self) -> MockState {
        self.inner.lock().state.clone()
    }

    /// 收到的全部指令（按到达顺序）
    pub fn commands(&self) -> Vec<Command> {
        self.inner.lock().log.clone()
    }

    pub fn clear_commands(&self) {
        self.inner.lock().log.clear();
    }

    /// 接下来 `count` 个请求不应答
    pub fn drop_responses(&self, count: usize) {
        self.inner.lock().silent = count;
    }

    /// 接下来 `count` 个应答的校验和被破坏
    pub fn corrupt_responses(&self, count: usize) {
        self.inner.lock().corrupt = count;
    }

    /// 接下来 `count` 次写入返回 IO 错误
    pub fn fail_writes(&self, count: usize) {
        self.inner.lock().fail_writes = count;
    }

    /// 把应答拆成多次读取返回
    pub fn set_chunk_size(&self, chunk_size: Option<usize>) {
        self.inner.lock().chunk_size = chunk_size.filter(|n| *n > 0);
    }

    /// 在下一个应答前插入字节（应答被丢弃时仍会送出）
    pub fn inject_noise(&self, bytes: &[u8]) {
        self.inner.lock().noise.extend_from_slice(bytes);
    }

    /// 直接向接收缓冲区推入字节（模拟迟到的应答）
    pub fn push_raw(&self, bytes: &[u8]) {
        self.inner.lock().rx.extend(bytes.iter().copied());
    }

    pub fn pending_bytes(&self) -> usize {
        self.inner.lock().rx.len()
    }
}

impl Inner {
    fn apply(&mut self, command: &Command) -> Response {
        let state = &mut self.state;
        match command {
            Command::GetDeviceSn => Response::Text(state.serial_number.clone()),
            Command::GetDeviceName => Response::Text(state.device_name.clone()),
            Command::SetDeviceName { name } => {
                state.device_name = name.clone();
                Response::Unit
            },
            Command::GetHomeParams => Response::Position(state.home),
            Command::SetHomeParams { position, .. } => {
                state.home = *position;
                Response::Unit
            },
            Command::SetHomeCmd { .. } => {
                state.pose = state.home;
                Response::Unit
            },
            Command::GetSuctionCup => Response::Bool(state.suction),
            Command::SetSuctionCup { enabled, .. } => {
                state.suction = *enabled;
                Response::Unit
            },
            Command::GetPtpCoordinateParams => Response::Profile(state.profile),
            Command::SetPtpCoordinateParams { profile, .. } => {
                state.profile = *profile;
                Response::Unit
            },
            Command::GetPtpJumpParams => Response::Lift(state.lift),
            Command::SetPtpJumpParams { params, .. } => {
                state.lift = *params;
                Response::Unit
            },
            Command::SetPtpCmd { target, .. } => {
                state.pose = *target;
                Response::Unit
            },
            Command::StartQueue => {
                state.queue_running = true;
                Response::Unit
            },
            Command::StopQueue => {
                state.queue_running = false;
                Response::Unit
            },
            Command::ClearQueue => {
                state.queue_index = 0;
                Response::Unit
            },
        }
    }

    fn handle_request(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let frame = Frame::decode(bytes)
            .map_err(|e| TransportError::Device(format!("mock: bad request: {e}")))?;
        let command = Command::decode(&frame)
            .map_err(|e| TransportError::Device(format!("mock: bad request: {e}")))?;
        debug!("MockDobot received {:?}", command);

        let response = self.apply(&command);
        let queued = command.is_queued();
        self.log.push(command);

        // 线路噪声与应答是否丢失无关
        let noise = std::mem::take(&mut self.noise);
        self.rx.extend(noise);

        if self.silent > 0 {
            self.silent -= 1;
            trace!("MockDobot dropping response");
            return Ok(());
        }

        // 入队指令应答队列索引
        let payload = if queued {
            self.state.queue_index += 1;
            self.state.queue_index.to_le_bytes().to_vec()
        } else {
            response.payload()
        };

        let mut reply = encode(
            frame.command,
            frame.control.is_write(),
            frame.control.is_queued(),
            &payload,
        )
        .map_err(|e| TransportError::Device(format!("mock: {e}")))?;

        if self.corrupt > 0 {
            self.corrupt -= 1;
            if let Some(last) = reply.last_mut() {
                *last ^= 0xFF;
            }
        }

        self.rx.extend(reply);
        Ok(())
    }
}

impl Transport for MockDobot {
    fn open(&mut self, spec: &PortSpec) -> Result<(), TransportError> {
        debug!("MockDobot opened as '{}'", spec.port_name);
        self.inner.lock().open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(TransportError::NotOpen);
        }
        if inner.fail_writes > 0 {
            inner.fail_writes -= 1;
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        inner.handle_request(bytes)
    }

    fn read_with_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        {
            let mut inner = self.inner.lock();
            if !inner.open {
                return Err(TransportError::NotOpen);
            }
            if !inner.rx.is_empty() {
                let n = inner.chunk_size.unwrap_or(usize::MAX).min(inner.rx.len());
                return Ok(inner.rx.drain(..n).collect());
            }
        }
        std::thread::sleep(timeout.min(IDLE_POLL));
        Ok(Vec::new())
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.inner.lock().rx.clear();
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock();
        inner.open = false;
        inner.rx.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dobot_protocol::{ID_DEVICE_SN, validate};

    fn opened() -> MockDobot {
        let mut mock = MockDobot::new();
        mock.open(&PortSpec::new("mock")).unwrap();
        mock
    }

    #[test]
    fn test_write_requires_open() {
        let mut mock = MockDobot::new();
        let frame = Command::GetDeviceSn.encode().unwrap();
        assert!(matches!(mock.write(&frame), Err(TransportError::NotOpen)));
    }

    #[test]
    fn test_answers_serial_number() {
        let mut mock = opened();
        mock.write(&Command::GetDeviceSn.encode().unwrap()).unwrap();
        let reply = mock.read_with_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(validate(&reply, ID_DEVICE_SN).unwrap(), b"DT-MOCK-0001");
        assert_eq!(mock.commands(), vec![Command::GetDeviceSn]);
    }

    #[test]
    fn test_silent_response() {
        let mut mock = opened();
        mock.drop_responses(1);
        mock.write(&Command::GetDeviceSn.encode().unwrap()).unwrap();
        assert!(mock.read_with_timeout(Duration::from_millis(1)).unwrap().is_empty());
        // 指令仍被记录
        assert_eq!(mock.commands().len(), 1);
    }

    #[test]
    fn test_chunked_reads() {
        let mut mock = opened();
        mock.set_chunk_size(Some(4));
        mock.write(&Command::GetDeviceName.encode().unwrap()).unwrap();
        let first = mock.read_with_timeout(Duration::from_millis(1)).unwrap();
        assert_eq!(first.len(), 4);
        assert!(mock.pending_bytes() > 0);
    }

    #[test]
    fn test_state_follows_commands() {
        let mut mock = opened();
        let name = Command::SetDeviceName {
            name: "picker".to_string(),
        };
        mock.write(&name.encode().unwrap()).unwrap();
        mock.write(
            &Command::SetSuctionCup {
                enabled: true,
                queued: true,
            }
            .encode()
            .unwrap(),
        )
        .unwrap();

        let state = mock.state();
        assert_eq!(state.device_name, "picker");
        assert!(state.suction);
        assert_eq!(state.queue_index, 1);
    }

    #[test]
    fn test_clear_input_and_close() {
        let mut mock = opened();
        mock.push_raw(&[1, 2, 3]);
        mock.clear_input().unwrap();
        assert_eq!(mock.pending_bytes(), 0);
        mock.close();
        assert!(!mock.is_open());
    }
}
