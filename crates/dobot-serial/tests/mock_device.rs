//! MockDobot 集成测试
//!
//! 通过 `Transport` trait 对象驱动模拟设备。

use dobot_protocol::*;
use dobot_serial::{MockDobot, PortSpec, Transport, TransportError};
use std::time::Duration;

fn open_boxed(mock: &MockDobot) -> Box<dyn Transport> {
    let mut transport: Box<dyn Transport> = Box::new(mock.clone());
    transport.open(&PortSpec::new("mock")).unwrap();
    transport
}

#[test]
fn test_queued_ack_carries_queue_index() {
    let mock = MockDobot::new();
    let mut transport = open_boxed(&mock);

    let cmd = Command::SetPtpCmd {
        mode: PtpMode::JumpXyz,
        target: Position::new(10.0, 20.0, 30.0, 0.0),
        queued: true,
    };
    transport.write(&cmd.encode().unwrap()).unwrap();
    let reply = transport
        .read_with_timeout(Duration::from_millis(10))
        .unwrap();

    let payload = validate(&reply, ID_PTP_CMD).unwrap();
    assert_eq!(payload, &1u64.to_le_bytes());
    assert_eq!(cmd.parse_response(payload).unwrap(), Response::Unit);
    assert_eq!(mock.state().pose, Position::new(10.0, 20.0, 30.0, 0.0));
}

#[test]
fn test_corrupted_reply_fails_checksum() {
    let mock = MockDobot::new();
    let mut transport = open_boxed(&mock);
    mock.corrupt_responses(1);

    transport
        .write(&Command::GetDeviceName.encode().unwrap())
        .unwrap();
    let reply = transport
        .read_with_timeout(Duration::from_millis(10))
        .unwrap();
    assert!(matches!(
        validate(&reply, ID_DEVICE_NAME),
        Err(ProtocolError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_noise_precedes_reply() {
    let mock = MockDobot::new();
    let mut transport = open_boxed(&mock);
    mock.inject_noise(&[0x00, 0x13]);

    transport.write(&Command::StartQueue.encode().unwrap()).unwrap();
    let reply = transport
        .read_with_timeout(Duration::from_millis(10))
        .unwrap();
    assert_eq!(find_header(&reply), Some(2));
    assert!(validate(&reply[2..], ID_QUEUED_CMD_START_EXEC).is_ok());
    assert!(mock.state().queue_running);
}

#[test]
fn test_write_failure_is_reported() {
    let mock = MockDobot::new();
    let mut transport = open_boxed(&mock);
    mock.fail_writes(1);

    let frame = Command::ClearQueue.encode().unwrap();
    assert!(matches!(
        transport.write(&frame),
        Err(TransportError::Io(_))
    ));
    assert!(transport.write(&frame).is_ok());
    assert_eq!(mock.commands(), vec![Command::ClearQueue]);
}

#[test]
fn test_rejects_garbage_request() {
    let mock = MockDobot::new();
    let mut transport = open_boxed(&mock);
    assert!(matches!(
        transport.write(&[0x01, 0x02, 0x03]),
        Err(TransportError::Device(_))
    ));
    assert!(mock.commands().is_empty());
}
