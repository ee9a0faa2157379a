//! serialport 后端
//!
//! 115200 baud, 8 数据位，无校验，1 停止位，无流控。

use crate::{PortSpec, Transport, TransportError};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

const READ_CHUNK: usize = 256;

/// 基于 `serialport` crate 的串口传输
#[derive(Default)]
pub struct SerialPortTransport {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
}

impl SerialPortTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 列出系统中的串口名称
    pub fn available_ports() -> Result<Vec<String>, TransportError> {
        let ports = serialport::available_ports().map_err(map_serial_error)?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

fn map_serial_error(err: serialport::Error) -> TransportError {
    match err.kind() {
        serialport::ErrorKind::Io(kind) => {
            TransportError::Io(std::io::Error::new(kind, err.description))
        },
        _ => TransportError::Device(err.description),
    }
}

impl Transport for SerialPortTransport {
    fn open(&mut self, spec: &PortSpec) -> Result<(), TransportError> {
        if self.port.is_some() {
            debug!("Serial port '{}' already open", self.port_name);
            return Ok(());
        }

        let port = serialport::new(&spec.port_name, spec.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(spec.read_timeout)
            .open()
            .map_err(|e| TransportError::Open {
                port: spec.port_name.clone(),
                message: e.description,
            })?;

        debug!(
            "Serial port '{}' opened at {} baud",
            spec.port_name, spec.baud_rate
        );
        self.port = Some(port);
        self.port_name = spec.port_name.clone();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_with_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let port = self.port_mut()?;
        port.set_timeout(timeout).map_err(map_serial_error)?;

        let mut buf = [0u8; READ_CHUNK];
        match port.read(&mut buf) {
            Ok(n) => {
                trace!("Serial read {} bytes", n);
                Ok(buf[..n].to_vec())
            },
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(Vec::new())
            },
            Err(e) => Err(e.into()),
        }
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.port_mut()?
            .clear(ClearBuffer::Input)
            .map_err(map_serial_error)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Serial port '{}' closed", self.port_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_open_by_default() {
        let mut transport = SerialPortTransport::new();
        assert!(!transport.is_open());
        assert!(matches!(
            transport.write(&[0xAA]),
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.read_with_timeout(Duration::from_millis(1)),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let mut transport = SerialPortTransport::new();
        let spec = PortSpec::new("/dev/this-port-does-not-exist");
        let err = transport.open(&spec).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(!transport.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut transport = SerialPortTransport::new();
        transport.close();
        transport.close();
        assert!(!transport.is_open());
    }
}
