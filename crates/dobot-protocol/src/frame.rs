//! 帧编码和校验
//!
//! 所有函数都是纯函数，不持有状态，可在任意线程调用。

use crate::ProtocolError;
use crate::ids::*;
use bytes::BufMut;

/// 控制字节
///
/// - bit0: 写（1）/ 读（0）
/// - bit1: 入队（1）/ 立即执行（0）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Control(u8);

impl Control {
    const WRITE_BIT: u8 = 0x01;
    const QUEUED_BIT: u8 = 0x02;

    pub const fn new(is_write: bool, is_queued: bool) -> Self {
        let mut bits = 0;
        if is_write {
            bits |= Self::WRITE_BIT;
        }
        if is_queued {
            bits |= Self::QUEUED_BIT;
        }
        Self(bits)
    }

    /// 从原始字节构造（保留未定义的高位）
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_write(self) -> bool {
        self.0 & Self::WRITE_BIT != 0
    }

    pub const fn is_queued(self) -> bool {
        self.0 & Self::QUEUED_BIT != 0
    }
}

impl From<u8> for Control {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

/// 计算校验和
///
/// 返回值使 `bytes` 各字节与校验和之和模 256 为 0，即 `(~sum + 1) & 0xFF`。
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0u8.wrapping_sub(sum)
}

/// 编码一帧
///
/// 空负载生成 6 字节的最小帧。负载超过 [`MAX_PAYLOAD_LEN`] 时返回 `InvalidValue`，
/// 因为长度字段只有一个字节。
pub fn encode(
    command_code: u8,
    is_write: bool,
    is_queued: bool,
    payload: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::InvalidValue {
            field: "payload length".to_string(),
            value: payload.len().to_string(),
        });
    }

    let control = Control::new(is_write, is_queued);
    let mut buf = Vec::with_capacity(MIN_FRAME_SIZE + payload.len());
    buf.put_slice(&HEADER);
    buf.put_u8((LENGTH_OVERHEAD + payload.len()) as u8);
    buf.put_u8(command_code);
    buf.put_u8(control.bits());
    buf.put_slice(payload);
    let sum = checksum(&buf[COMMAND_INDEX..]);
    buf.put_u8(sum);
    Ok(buf)
}

/// 解析后的帧视图（借用原始缓冲区）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub command: u8,
    pub control: Control,
    pub payload: &'a [u8],
}

/// 结构检查：长度、帧头、声明长度、校验和
///
/// 不检查指令 ID。帧末尾之后的多余字节被忽略。
fn check(bytes: &[u8]) -> Result<FrameView<'_>, ProtocolError> {
    if bytes.len() < MIN_FRAME_SIZE {
        return Err(ProtocolError::malformed(format!(
            "frame too short: {} bytes, need at least {}",
            bytes.len(),
            MIN_FRAME_SIZE
        )));
    }
    if bytes[..HEADER_SIZE] != HEADER {
        return Err(ProtocolError::malformed(format!(
            "bad header: {:02X} {:02X}",
            bytes[0], bytes[1]
        )));
    }

    let declared = bytes[LENGTH_INDEX] as usize;
    if declared < LENGTH_OVERHEAD {
        return Err(ProtocolError::malformed(format!(
            "declared length {} smaller than {}",
            declared, LENGTH_OVERHEAD
        )));
    }
    let payload_len = declared - LENGTH_OVERHEAD;
    if payload_len > bytes.len() - MIN_FRAME_SIZE {
        return Err(ProtocolError::malformed(format!(
            "declared length {} exceeds received {} bytes",
            declared,
            bytes.len()
        )));
    }

    let checksum_index = COMMAND_INDEX + declared;
    let expected = checksum(&bytes[COMMAND_INDEX..checksum_index]);
    let actual = bytes[checksum_index];
    if expected != actual {
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    Ok(FrameView {
        command: bytes[COMMAND_INDEX],
        control: Control::from_bits(bytes[CONTROL_INDEX]),
        payload: &bytes[PAYLOAD_INDEX..checksum_index],
    })
}

/// 校验响应帧并提取负载
///
/// 检查顺序：长度/帧头 → 声明长度 → 校验和 → 指令 ID。
pub fn validate(response: &[u8], expected_code: u8) -> Result<&[u8], ProtocolError> {
    let view = check(response)?;
    if view.command != expected_code {
        return Err(ProtocolError::UnexpectedCommand {
            expected: expected_code,
            actual: view.command,
        });
    }
    Ok(view.payload)
}

/// 缓冲区中一帧所需的总字节数
///
/// 需要帧头和长度字节都已到达，且缓冲区以帧头开始；否则返回 `None`。
pub fn frame_len(buffer: &[u8]) -> Option<usize> {
    if buffer.len() <= LENGTH_INDEX || buffer[..HEADER_SIZE] != HEADER {
        return None;
    }
    Some(buffer[LENGTH_INDEX] as usize + HEADER_SIZE + 2)
}

/// 查找帧头起始位置
pub fn find_header(buffer: &[u8]) -> Option<usize> {
    buffer.windows(HEADER_SIZE).position(|w| w == HEADER)
}

/// 拥有所有权的帧
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub command: u8,
    pub control: Control,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(command: u8, control: Control, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            command,
            control,
            payload: payload.into(),
        }
    }

    /// 解码一帧（不限定指令 ID）
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let view = check(bytes)?;
        Ok(Self {
            command: view.command,
            control: view.control,
            payload: view.payload.to_vec(),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        encode(
            self.command,
            self.control.is_write(),
            self.control.is_queued(),
            &self.payload,
        )
    }

    /// 还原为已知指令（依据编号 + 写方向）
    pub fn command_id(&self) -> Result<CommandId, ProtocolError> {
        CommandId::resolve(self.command, self.control.is_write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_bits() {
        assert_eq!(Control::new(false, false).bits(), 0x00);
        assert_eq!(Control::new(true, false).bits(), 0x01);
        assert_eq!(Control::new(false, true).bits(), 0x02);
        assert_eq!(Control::new(true, true).bits(), 0x03);

        let c = Control::from(0x03);
        assert!(c.is_write());
        assert!(c.is_queued());
    }

    #[test]
    fn test_checksum_balances() {
        let bytes = [84u8, 0x03, 0x01, 0x10, 0xFF];
        let sum = checksum(&bytes);
        let total = bytes
            .iter()
            .chain(std::iter::once(&sum))
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(total, 0);
    }

    #[test]
    fn test_checksum_of_zero_sum_is_zero() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x80, 0x80]), 0);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode(ID_QUEUED_CMD_START_EXEC, true, false, &[]).unwrap();
        assert_eq!(frame.len(), MIN_FRAME_SIZE);
        assert_eq!(frame[..2], HEADER);
        assert_eq!(frame[LENGTH_INDEX], 2);
        assert_eq!(frame[COMMAND_INDEX], 240);
        assert_eq!(frame[CONTROL_INDEX], 0x01);
        // 240 + 1 = 241，补数为 15
        assert_eq!(frame[5], 15);
    }

    #[test]
    fn test_encode_ptp_frame_layout() {
        let mut payload = vec![u8::from(crate::PtpMode::MovlXyz)];
        for v in [200.0f32, 0.0, -30.0, 0.0] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let frame = encode(ID_PTP_CMD, true, true, &payload).unwrap();

        assert_eq!(frame.len(), 23);
        assert_eq!(frame[LENGTH_INDEX], 19);
        assert_eq!(frame[COMMAND_INDEX], 84);
        assert_eq!(frame[CONTROL_INDEX], 0x03);
        assert_eq!(frame[PAYLOAD_INDEX], 2);
        assert_eq!(&frame[6..10], &200.0f32.to_le_bytes());
        assert_eq!(validate(&frame, ID_PTP_CMD).unwrap(), &payload[..]);
    }

    #[test]
    fn test_encode_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert!(matches!(
            encode(ID_DEVICE_NAME, true, false, &payload),
            Err(ProtocolError::InvalidValue { .. })
        ));
        assert!(encode(ID_DEVICE_NAME, true, false, &payload[1..]).is_ok());
    }

    #[test]
    fn test_validate_too_short() {
        let err = validate(&[0xAA, 0xAA, 0x02, 0x00, 0x00], 0).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame { .. }));
        assert!(validate(&[], 0).is_err());
    }

    #[test]
    fn test_validate_bad_header() {
        let mut frame = encode(ID_DEVICE_SN, false, false, &[]).unwrap();
        frame[0] = 0x55;
        let err = validate(&frame, ID_DEVICE_SN).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame { .. }));
    }

    #[test]
    fn test_validate_declared_length_exceeds_buffer() {
        let mut frame = encode(ID_DEVICE_SN, false, false, b"abc").unwrap();
        frame[LENGTH_INDEX] = 40;
        let err = validate(&frame, ID_DEVICE_SN).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame { .. }));
    }

    #[test]
    fn test_validate_declared_length_below_overhead() {
        let mut frame = encode(ID_DEVICE_SN, false, false, &[]).unwrap();
        frame[LENGTH_INDEX] = 1;
        let err = validate(&frame, ID_DEVICE_SN).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame { .. }));
    }

    #[test]
    fn test_validate_wrong_command() {
        let frame = encode(ID_HOME_CMD, true, true, &[0; 4]).unwrap();
        let err = validate(&frame, ID_PTP_CMD).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnexpectedCommand {
                expected: 84,
                actual: 31
            }
        );
    }

    #[test]
    fn test_validate_corrupted_checksum() {
        let mut frame = encode(ID_DEVICE_NAME, false, false, b"dobot").unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert!(matches!(
            validate(&frame, ID_DEVICE_NAME),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_ignores_trailing_bytes() {
        let mut frame = encode(ID_DEVICE_NAME, false, false, b"arm").unwrap();
        frame.extend_from_slice(&[0xAA, 0xAA, 0x02]);
        assert_eq!(validate(&frame, ID_DEVICE_NAME).unwrap(), b"arm");
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(frame_len(&[0xAA, 0xAA]), None);
        assert_eq!(frame_len(&[0x00, 0xAA, 0x02]), None);
        assert_eq!(frame_len(&[0xAA, 0xAA, 0x02]), Some(6));
        assert_eq!(frame_len(&[0xAA, 0xAA, 19, 84]), Some(23));
    }

    #[test]
    fn test_find_header() {
        assert_eq!(find_header(&[0x01, 0x02, 0xAA, 0xAA, 0x02]), Some(2));
        assert_eq!(find_header(&[0xAA]), None);
        assert_eq!(find_header(&[0xAA, 0x01, 0xAA]), None);
    }

    #[test]
    fn test_frame_decode() {
        let bytes = encode(ID_END_EFFECTOR_SUCTION_CUP, true, true, &[1, 1]).unwrap();
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.command, ID_END_EFFECTOR_SUCTION_CUP);
        assert!(frame.control.is_write());
        assert!(frame.control.is_queued());
        assert_eq!(frame.payload, vec![1, 1]);
        assert_eq!(
            frame.command_id().unwrap(),
            CommandId::SetEndEffectorSuctionCup
        );
        assert_eq!(frame.encode().unwrap(), bytes);
    }
}
