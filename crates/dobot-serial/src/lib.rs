//! # Dobot Serial Transport Layer
//!
//! 串口传输抽象层，为执行器提供统一的字节流接口。
//!
//! - `serial`（默认 feature）：基于 `serialport` 的真实串口后端
//! - `mock`：模拟 Dobot 设备，解码请求并生成应答帧

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialPortTransport;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::MockDobot;

/// Dobot 串口默认波特率（8N1）
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to open {port}: {message}")]
    Open { port: String, message: String },
    #[error("Port not open")]
    NotOpen,
    #[error("Device Error: {0}")]
    Device(String),
}

/// 串口参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    /// 设备路径（如 `/dev/ttyUSB0`、`COM3`）
    pub port_name: String,
    pub baud_rate: u32,
    /// 打开端口时使用的底层读超时
    pub read_timeout: Duration,
}

impl PortSpec {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(dobot_protocol::DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// 字节流传输接口
///
/// 实现必须是 `Send`，执行器在互斥锁内独占使用。
pub trait Transport: Send {
    fn open(&mut self, spec: &PortSpec) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// 在超时内读取已到达的字节；超时无数据时返回空 `Vec`
    fn read_with_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// 丢弃输入缓冲区中的残留字节
    fn clear_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, spec: &PortSpec) -> Result<(), TransportError> {
        (**self).open(spec)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn read_with_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read_with_timeout(timeout)
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        (**self).clear_input()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_spec_defaults() {
        let spec = PortSpec::new("/dev/ttyUSB0");
        assert_eq!(spec.port_name, "/dev/ttyUSB0");
        assert_eq!(spec.baud_rate, 115_200);
        assert_eq!(spec.read_timeout, Duration::from_millis(200));
    }

    #[test]
    fn test_port_spec_builder() {
        let spec = PortSpec::new("COM3")
            .with_baud_rate(9600)
            .with_read_timeout(Duration::from_millis(50));
        assert_eq!(spec.baud_rate, 9600);
        assert_eq!(spec.read_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Open {
            port: "/dev/ttyACM0".to_string(),
            message: "No such file or directory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open /dev/ttyACM0: No such file or directory"
        );
        assert_eq!(TransportError::NotOpen.to_string(), "Port not open");
    }
}
