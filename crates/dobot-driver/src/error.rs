//! 驱动层错误类型定义

use dobot_protocol::{CommandId, ProtocolError};
use dobot_serial::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口未打开，请求未发送
    #[error("Not connected")]
    NotConnected,

    /// 写入串口失败
    #[error("Send failed: {0}")]
    SendFailed(#[source] TransportError),

    /// 超时前没有收到任何字节
    #[error("No response to {command} within {timeout_ms} ms")]
    NoResponse { command: CommandId, timeout_ms: u64 },

    /// 应答帧结构、校验和或指令 ID 错误
    #[error("Invalid response: {0}")]
    InvalidResponse(#[source] ProtocolError),

    /// 应答负载无法解析
    #[error("Response parse failure: {0}")]
    ParseFailure(#[source] ProtocolError),

    /// 请求无法编码（如名称过长）
    #[error("Invalid request: {0}")]
    InvalidRequest(#[source] ProtocolError),

    /// 读取或打开串口时的传输错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 应答类型与指令不匹配
    #[error("Unexpected response to {command}: {response}")]
    UnexpectedResponse { command: CommandId, response: String },

    /// 后端未编译进来
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// 是否为链路层问题（重连可能恢复）
    pub fn is_link_error(&self) -> bool {
        matches!(
            self,
            DriverError::NotConnected | DriverError::SendFailed(_) | DriverError::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");

        let err = DriverError::NoResponse {
            command: CommandId::GetDeviceSn,
            timeout_ms: 200,
        };
        assert_eq!(
            err.to_string(),
            "No response to GET_DEVICE_SN (0) within 200 ms"
        );

        let err = DriverError::InvalidResponse(ProtocolError::ChecksumMismatch {
            expected: 1,
            actual: 2,
        });
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_from_transport_error() {
        let err: DriverError = TransportError::NotOpen.into();
        assert!(matches!(err, DriverError::Transport(TransportError::NotOpen)));
        assert!(err.is_link_error());
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;
        let err = DriverError::ParseFailure(ProtocolError::PayloadTooShort {
            expected: 16,
            actual: 3,
        });
        assert!(err.source().is_some());
        assert!(!err.is_link_error());
    }
}
