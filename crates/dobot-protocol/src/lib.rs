//! # Dobot Protocol
//!
//! Dobot 机械臂串口二进制协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 帧布局常量和指令 ID
//! - `frame`: 帧编码、校验和解码
//! - `command`: 指令描述表（请求负载构建 / 响应负载解析）
//!
//! ## 帧格式
//!
//! ```text
//! AA AA | len | cmd | ctrl | payload ... | checksum
//! ```
//!
//! - `len = 2 + payload.len()`（包含 cmd 和 ctrl 两个字节）
//! - `ctrl` bit0 = 写，bit1 = 入队
//! - `checksum` 使 `cmd..=payload` 所有字节之和模 256 为 0
//!
//! ## 字节序
//!
//! 与 CAN 协议不同，多字节数值字段均为小端字节序（little-endian）。

pub mod command;
pub mod frame;
pub mod ids;

// 重新导出常用类型
pub use command::*;
pub use frame::*;
pub use ids::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Unexpected command id: expected {expected}, got {actual}")]
    UnexpectedCommand { expected: u8, actual: u8 },

    #[error("Payload too short: expected {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unknown command: code {code}, write={is_write}")]
    UnknownCommand { code: u8, is_write: bool },
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ProtocolError::MalformedFrame {
            reason: reason.into(),
        }
    }
}

/// 小端字节序工具函数
pub fn f32_from_le(bytes: &[u8; 4]) -> f32 {
    f32::from_le_bytes(*bytes)
}
