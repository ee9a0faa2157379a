//! 指令描述表
//!
//! `Command` 是一个封闭枚举，每个变体携带其类型化参数和入队标志，
//! 负责生成请求负载并解析对应的响应负载。设备侧（模拟器）使用
//! [`Command::decode`] 和 [`Response::payload`] 完成反方向的转换。

use crate::frame::{self, Control, Frame};
use crate::ids::*;
use crate::{ProtocolError, f32_from_le};
use bytes::BufMut;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// 基础数据类型
// ============================================================================

/// PTP 运动模式（PTP 负载首字节）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::IntoPrimitive, num_enum::TryFromPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PtpMode {
    /// 门型运动，笛卡尔坐标
    JumpXyz = 0,
    /// 关节插补，笛卡尔坐标
    MovjXyz = 1,
    /// 直线插补，笛卡尔坐标
    MovlXyz = 2,
    JumpAngle = 3,
    MovjAngle = 4,
    MovlAngle = 5,
    MovjInc = 6,
    MovlInc = 7,
    MovjXyzInc = 8,
    JumpMovlXyz = 9,
}

impl PtpMode {
    pub fn from_byte(value: u8) -> Result<Self, ProtocolError> {
        Self::try_from(value).map_err(|_| ProtocolError::InvalidValue {
            field: "ptp mode".to_string(),
            value: value.to_string(),
        })
    }
}

/// 笛卡尔坐标 + 末端旋转（mm, mm, mm, °）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32, r: f32) -> Self {
        Self { x, y, z, r }
    }

    /// 替换 z，其余分量保持不变
    pub const fn with_z(self, z: f32) -> Self {
        Self { z, ..self }
    }

    fn put(&self, buf: &mut Vec<u8>) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
        buf.put_f32_le(self.r);
    }

    fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let [x, y, z, r] = read_f32s::<4>(payload)?;
        Ok(Self { x, y, z, r })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.z, self.r)
    }
}

/// 从 `"x,y,z,r"` 文本解析（恰好 4 个数值，允许空白）
impl FromStr for Position {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidValue {
            field: "position".to_string(),
            value: s.to_string(),
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(invalid());
        }
        let mut values = [0.0f32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        let [x, y, z, r] = values;
        Ok(Self { x, y, z, r })
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Position {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// 配置文件中既可写 `"x,y,z,r"` 也可写表
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Table {
                x: f32,
                y: f32,
                z: f32,
                #[serde(default)]
                r: f32,
            },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Table { x, y, z, r } => Ok(Position::new(x, y, z, r)),
        }
    }
}

/// PTP 坐标轴速度/加速度参数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementProfile {
    /// mm/s
    pub xyz_velocity: f32,
    /// °/s
    pub r_velocity: f32,
    /// mm/s²
    pub xyz_acceleration: f32,
    /// °/s²
    pub r_acceleration: f32,
}

impl MovementProfile {
    pub const fn new(
        xyz_velocity: f32,
        r_velocity: f32,
        xyz_acceleration: f32,
        r_acceleration: f32,
    ) -> Self {
        Self {
            xyz_velocity,
            r_velocity,
            xyz_acceleration,
            r_acceleration,
        }
    }

    /// 四个分量使用同一个值
    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let [a, b, c, d] = read_f32s::<4>(payload)?;
        Ok(Self::new(a, b, c, d))
    }
}

/// PTP 门型运动参数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LiftParams {
    /// 抬升高度（mm）
    pub jump_height: f32,
    /// 最大高度（mm）
    pub max_height: f32,
}

impl LiftParams {
    pub const fn new(jump_height: f32, max_height: f32) -> Self {
        Self {
            jump_height,
            max_height,
        }
    }

    fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let [jump_height, max_height] = read_f32s::<2>(payload)?;
        Ok(Self::new(jump_height, max_height))
    }
}

/// 读取 N 个小端 f32
fn read_f32s<const N: usize>(payload: &[u8]) -> Result<[f32; N], ProtocolError> {
    let expected = N * 4;
    if payload.len() < expected {
        return Err(ProtocolError::PayloadTooShort {
            expected,
            actual: payload.len(),
        });
    }
    let mut out = [0.0f32; N];
    for (slot, chunk) in out.iter_mut().zip(payload.chunks_exact(4)) {
        *slot = f32_from_le(&[chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(out)
}

fn require_len(payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() < expected {
        return Err(ProtocolError::PayloadTooShort {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

// ============================================================================
// 指令
// ============================================================================

/// 设备指令（请求描述符）
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetDeviceSn,
    GetDeviceName,
    SetDeviceName { name: String },
    GetHomeParams,
    SetHomeParams { position: Position, queued: bool },
    SetHomeCmd { queued: bool },
    GetSuctionCup,
    SetSuctionCup { enabled: bool, queued: bool },
    GetPtpCoordinateParams,
    SetPtpCoordinateParams { profile: MovementProfile, queued: bool },
    GetPtpJumpParams,
    SetPtpJumpParams { params: LiftParams, queued: bool },
    SetPtpCmd { mode: PtpMode, target: Position, queued: bool },
    StartQueue,
    StopQueue,
    ClearQueue,
}

impl Command {
    pub fn command_id(&self) -> CommandId {
        match self {
            Command::GetDeviceSn => CommandId::GetDeviceSn,
            Command::GetDeviceName => CommandId::GetDeviceName,
            Command::SetDeviceName { .. } => CommandId::SetDeviceName,
            Command::GetHomeParams => CommandId::GetHomeParams,
            Command::SetHomeParams { .. } => CommandId::SetHomeParams,
            Command::SetHomeCmd { .. } => CommandId::SetHomeCmd,
            Command::GetSuctionCup => CommandId::GetEndEffectorSuctionCup,
            Command::SetSuctionCup { .. } => CommandId::SetEndEffectorSuctionCup,
            Command::GetPtpCoordinateParams => CommandId::GetPtpCoordinateParams,
            Command::SetPtpCoordinateParams { .. } => CommandId::SetPtpCoordinateParams,
            Command::GetPtpJumpParams => CommandId::GetPtpJumpParams,
            Command::SetPtpJumpParams { .. } => CommandId::SetPtpJumpParams,
            Command::SetPtpCmd { .. } => CommandId::SetPtpCmd,
            Command::StartQueue => CommandId::SetQueuedCmdStartExec,
            Command::StopQueue => CommandId::SetQueuedCmdStopExec,
            Command::ClearQueue => CommandId::SetQueuedCmdClear,
        }
    }

    /// 是否入队执行
    pub fn is_queued(&self) -> bool {
        match self {
            Command::SetHomeParams { queued, .. }
            | Command::SetHomeCmd { queued }
            | Command::SetSuctionCup { queued, .. }
            | Command::SetPtpCoordinateParams { queued, .. }
            | Command::SetPtpJumpParams { queued, .. }
            | Command::SetPtpCmd { queued, .. } => *queued,
            _ => false,
        }
    }

    pub fn control(&self) -> Control {
        Control::new(self.command_id().is_write(), self.is_queued())
    }

    /// 请求负载
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Command::SetDeviceName { name } => buf.put_slice(name.as_bytes()),
            Command::SetHomeParams { position, .. } => position.put(&mut buf),
            // 4 字节保留位
            Command::SetHomeCmd { .. } => buf.put_u32_le(0),
            // 吸盘：控制使能 + 吸取状态，两者取同一个值
            Command::SetSuctionCup { enabled, .. } => {
                buf.put_u8(*enabled as u8);
                buf.put_u8(*enabled as u8);
            },
            Command::SetPtpCoordinateParams { profile, .. } => {
                buf.put_f32_le(profile.xyz_velocity);
                buf.put_f32_le(profile.r_velocity);
                buf.put_f32_le(profile.xyz_acceleration);
                buf.put_f32_le(profile.r_acceleration);
            },
            Command::SetPtpJumpParams { params, .. } => {
                buf.put_f32_le(params.jump_height);
                buf.put_f32_le(params.max_height);
            },
            Command::SetPtpCmd { mode, target, .. } => {
                buf.put_u8((*mode).into());
                target.put(&mut buf);
            },
            Command::GetDeviceSn
            | Command::GetDeviceName
            | Command::GetHomeParams
            | Command::GetSuctionCup
            | Command::GetPtpCoordinateParams
            | Command::GetPtpJumpParams
            | Command::StartQueue
            | Command::StopQueue
            | Command::ClearQueue => {},
        }
        buf
    }

    /// 编码为完整帧
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let id = self.command_id();
        frame::encode(id.code(), id.is_write(), self.is_queued(), &self.payload())
    }

    /// 解析响应负载
    ///
    /// 写指令的响应负载被忽略（设备可能回传队列索引）。
    pub fn parse_response(&self, payload: &[u8]) -> Result<Response, ProtocolError> {
        match self {
            Command::GetDeviceSn | Command::GetDeviceName => Ok(Response::Text(
                String::from_utf8_lossy(payload).into_owned(),
            )),
            Command::GetHomeParams => Position::parse(payload).map(Response::Position),
            Command::GetSuctionCup => {
                require_len(payload, 2)?;
                Ok(Response::Bool(payload[1] != 0))
            },
            Command::GetPtpCoordinateParams => {
                MovementProfile::parse(payload).map(Response::Profile)
            },
            Command::GetPtpJumpParams => LiftParams::parse(payload).map(Response::Lift),
            _ => Ok(Response::Unit),
        }
    }

    /// 从请求帧还原指令（设备侧）
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let queued = frame.control.is_queued();
        let payload = frame.payload.as_slice();
        let command = match frame.command_id()? {
            CommandId::GetDeviceSn => Command::GetDeviceSn,
            CommandId::GetDeviceName => Command::GetDeviceName,
            CommandId::SetDeviceName => Command::SetDeviceName {
                name: String::from_utf8_lossy(payload).into_owned(),
            },
            CommandId::GetHomeParams => Command::GetHomeParams,
            CommandId::SetHomeParams => Command::SetHomeParams {
                position: Position::parse(payload)?,
                queued,
            },
            CommandId::SetHomeCmd => {
                require_len(payload, 4)?;
                Command::SetHomeCmd { queued }
            },
            CommandId::GetEndEffectorSuctionCup => Command::GetSuctionCup,
            CommandId::SetEndEffectorSuctionCup => {
                require_len(payload, 2)?;
                Command::SetSuctionCup {
                    enabled: payload[1] != 0,
                    queued,
                }
            },
            CommandId::GetPtpCoordinateParams => Command::GetPtpCoordinateParams,
            CommandId::SetPtpCoordinateParams => Command::SetPtpCoordinateParams {
                profile: MovementProfile::parse(payload)?,
                queued,
            },
            CommandId::GetPtpJumpParams => Command::GetPtpJumpParams,
            CommandId::SetPtpJumpParams => Command::SetPtpJumpParams {
                params: LiftParams::parse(payload)?,
                queued,
            },
            CommandId::SetPtpCmd => {
                require_len(payload, 17)?;
                Command::SetPtpCmd {
                    mode: PtpMode::from_byte(payload[0])?,
                    target: Position::parse(&payload[1..])?,
                    queued,
                }
            },
            CommandId::SetQueuedCmdStartExec => Command::StartQueue,
            CommandId::SetQueuedCmdStopExec => Command::StopQueue,
            CommandId::SetQueuedCmdClear => Command::ClearQueue,
        };
        Ok(command)
    }
}

/// 响应值
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// 写指令确认
    Unit,
    Text(String),
    Bool(bool),
    Position(Position),
    Profile(MovementProfile),
    Lift(LiftParams),
}

impl Response {
    /// 响应负载（设备侧编码）
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Response::Unit => {},
            Response::Text(text) => buf.put_slice(text.as_bytes()),
            Response::Bool(value) => {
                buf.put_u8(*value as u8);
                buf.put_u8(*value as u8);
            },
            Response::Position(position) => position.put(&mut buf),
            Response::Profile(profile) => {
                buf.put_f32_le(profile.xyz_velocity);
                buf.put_f32_le(profile.r_velocity);
                buf.put_f32_le(profile.xyz_acceleration);
                buf.put_f32_le(profile.r_acceleration);
            },
            Response::Lift(params) => {
                buf.put_f32_le(params.jump_height);
                buf.put_f32_le(params.max_height);
            },
        }
        buf
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Response::Text(text) => Some(text),
            _ => None,
        }
    }
}
