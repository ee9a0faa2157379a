//! 帧布局常量和指令 ID 定义
//!
//! 定义帧头、字段偏移以及所有指令的编号。
//!
//! 注意：同一个编号可能同时用于"读"和"写"两个方向（例如设备名称的读取与设置
//! 都是 1），方向只由控制字节的 bit0 区分，不由 ID 区分。

use crate::ProtocolError;
use std::fmt;

// ============================================================================
// 帧布局
// ============================================================================

/// 同步帧头（两个字节均为 0xAA）
pub const HEADER: [u8; 2] = [0xAA, 0xAA];

/// 帧头长度
pub const HEADER_SIZE: usize = 2;

/// 最小帧长度：帧头(2) + 长度(1) + ID(1) + 控制(1) + 校验(1)
pub const MIN_FRAME_SIZE: usize = 6;

pub const LENGTH_INDEX: usize = 2;
pub const COMMAND_INDEX: usize = 3;
pub const CONTROL_INDEX: usize = 4;
pub const PAYLOAD_INDEX: usize = 5;

/// 长度字段中 ID + 控制字节占用的字节数
pub const LENGTH_OVERHEAD: usize = 2;

/// 单帧可携带的最大负载（长度字段只有 1 字节）
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize - LENGTH_OVERHEAD;

/// 默认响应超时（毫秒）
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 200;

// ============================================================================
// 指令编号
// ============================================================================

/// 设备序列号
pub const ID_DEVICE_SN: u8 = 0;

/// 设备名称（读/写共用）
pub const ID_DEVICE_NAME: u8 = 1;

/// 回零参数（读/写共用）
pub const ID_HOME_PARAMS: u8 = 30;

/// 回零指令
pub const ID_HOME_CMD: u8 = 31;

/// 末端吸盘（读/写共用）
pub const ID_END_EFFECTOR_SUCTION_CUP: u8 = 62;

/// PTP 坐标轴速度/加速度参数（读/写共用）
pub const ID_PTP_COORDINATE_PARAMS: u8 = 81;

/// PTP 门型运动参数（读/写共用）
pub const ID_PTP_JUMP_PARAMS: u8 = 82;

/// PTP 运动指令
pub const ID_PTP_CMD: u8 = 84;

/// 队列控制指令
pub const ID_QUEUED_CMD_START_EXEC: u8 = 240;
pub const ID_QUEUED_CMD_STOP_EXEC: u8 = 241;
pub const ID_QUEUED_CMD_CLEAR: u8 = 245;

/// 设备操作（封闭枚举）
///
/// 每个变体对应一个固定的指令编号和读写方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    GetDeviceSn,
    GetDeviceName,
    SetDeviceName,
    GetHomeParams,
    SetHomeParams,
    SetHomeCmd,
    GetEndEffectorSuctionCup,
    SetEndEffectorSuctionCup,
    GetPtpCoordinateParams,
    SetPtpCoordinateParams,
    GetPtpJumpParams,
    SetPtpJumpParams,
    SetPtpCmd,
    SetQueuedCmdStartExec,
    SetQueuedCmdStopExec,
    SetQueuedCmdClear,
}

impl CommandId {
    /// 所有指令（用于查表和测试）
    pub const ALL: [CommandId; 16] = [
        CommandId::GetDeviceSn,
        CommandId::GetDeviceName,
        CommandId::SetDeviceName,
        CommandId::GetHomeParams,
        CommandId::SetHomeParams,
        CommandId::SetHomeCmd,
        CommandId::GetEndEffectorSuctionCup,
        CommandId::SetEndEffectorSuctionCup,
        CommandId::GetPtpCoordinateParams,
        CommandId::SetPtpCoordinateParams,
        CommandId::GetPtpJumpParams,
        CommandId::SetPtpJumpParams,
        CommandId::SetPtpCmd,
        CommandId::SetQueuedCmdStartExec,
        CommandId::SetQueuedCmdStopExec,
        CommandId::SetQueuedCmdClear,
    ];

    /// 线上指令编号
    pub const fn code(self) -> u8 {
        match self {
            CommandId::GetDeviceSn => ID_DEVICE_SN,
            CommandId::GetDeviceName | CommandId::SetDeviceName => ID_DEVICE_NAME,
            CommandId::GetHomeParams | CommandId::SetHomeParams => ID_HOME_PARAMS,
            CommandId::SetHomeCmd => ID_HOME_CMD,
            CommandId::GetEndEffectorSuctionCup | CommandId::SetEndEffectorSuctionCup => {
                ID_END_EFFECTOR_SUCTION_CUP
            },
            CommandId::GetPtpCoordinateParams | CommandId::SetPtpCoordinateParams => {
                ID_PTP_COORDINATE_PARAMS
            },
            CommandId::GetPtpJumpParams | CommandId::SetPtpJumpParams => ID_PTP_JUMP_PARAMS,
            CommandId::SetPtpCmd => ID_PTP_CMD,
            CommandId::SetQueuedCmdStartExec => ID_QUEUED_CMD_START_EXEC,
            CommandId::SetQueuedCmdStopExec => ID_QUEUED_CMD_STOP_EXEC,
            CommandId::SetQueuedCmdClear => ID_QUEUED_CMD_CLEAR,
        }
    }

    /// 是否为写指令（控制字节 bit0）
    pub const fn is_write(self) -> bool {
        !matches!(
            self,
            CommandId::GetDeviceSn
                | CommandId::GetDeviceName
                | CommandId::GetHomeParams
                | CommandId::GetEndEffectorSuctionCup
                | CommandId::GetPtpCoordinateParams
                | CommandId::GetPtpJumpParams
        )
    }

    /// 是否允许进入设备指令队列
    ///
    /// 读指令、设备名称设置和队列控制指令总是立即执行。
    pub const fn is_queueable(self) -> bool {
        matches!(
            self,
            CommandId::SetHomeParams
                | CommandId::SetHomeCmd
                | CommandId::SetEndEffectorSuctionCup
                | CommandId::SetPtpCoordinateParams
                | CommandId::SetPtpJumpParams
                | CommandId::SetPtpCmd
        )
    }

    /// 由线上编号和读写方向还原指令
    pub fn resolve(code: u8, is_write: bool) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|id| id.code() == code && id.is_write() == is_write)
            .ok_or(ProtocolError::UnknownCommand { code, is_write })
    }

    /// 协议文档中的名称
    pub const fn name(self) -> &'static str {
        match self {
            CommandId::GetDeviceSn => "GET_DEVICE_SN",
            CommandId::GetDeviceName => "GET_DEVICE_NAME",
            CommandId::SetDeviceName => "SET_DEVICE_NAME",
            CommandId::GetHomeParams => "GET_HOME_PARAMS",
            CommandId::SetHomeParams => "SET_HOME_PARAMS",
            CommandId::SetHomeCmd => "SET_HOME_CMD",
            CommandId::GetEndEffectorSuctionCup => "GET_END_EFFECTOR_SUCTION_CUP",
            CommandId::SetEndEffectorSuctionCup => "SET_END_EFFECTOR_SUCTION_CUP",
            CommandId::GetPtpCoordinateParams => "GET_PTP_COORDINATE_PARAMS",
            CommandId::SetPtpCoordinateParams => "SET_PTP_COORDINATE_PARAMS",
            CommandId::GetPtpJumpParams => "GET_PTP_JUMP_PARAMS",
            CommandId::SetPtpJumpParams => "SET_PTP_JUMP_PARAMS",
            CommandId::SetPtpCmd => "SET_PTP_CMD",
            CommandId::SetQueuedCmdStartExec => "SET_QUEUED_CMD_START_EXEC",
            CommandId::SetQueuedCmdStopExec => "SET_QUEUED_CMD_STOP_EXEC",
            CommandId::SetQueuedCmdClear => "SET_QUEUED_CMD_CLEAR",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
