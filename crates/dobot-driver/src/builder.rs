//! Builder 模式实现
//!
//! 提供链式构造已连接 `CommandExecutor` 的便捷方式。

use crate::error::DriverError;
use crate::executor::CommandExecutor;
use crate::hooks::HexDumpHook;
use dobot_protocol::DEFAULT_RESPONSE_TIMEOUT_MS;
use dobot_serial::{DEFAULT_BAUD_RATE, PortSpec, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 驱动类型选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverType {
    /// 真实串口（需要 `serial` feature）
    #[default]
    Serial,
    /// 模拟设备（需要 `mock` feature）
    Mock,
}

/// Dobot Builder（链式构造）
///
/// ```no_run
/// use dobot_driver::DobotBuilder;
/// use std::time::Duration;
///
/// let executor = DobotBuilder::new()
///     .port("/dev/ttyUSB0")
///     .response_timeout(Duration::from_millis(300))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DobotBuilder {
    port: Option<String>,
    baud_rate: u32,
    response_timeout: Duration,
    driver_type: DriverType,
    hex_dump: bool,
}

impl Default for DobotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DobotBuilder {
    pub fn new() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            driver_type: DriverType::Serial,
            hex_dump: false,
        }
    }

    pub fn with_driver_type(mut self, driver_type: DriverType) -> Self {
        self.driver_type = driver_type;
        self
    }

    /// 串口路径（串口模式必填）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 波特率（可选，默认 115200）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// 应答超时（可选，默认 200ms）
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// 安装 `HexDumpHook`，在 trace 级别记录原始帧
    pub fn hex_dump(mut self, enabled: bool) -> Self {
        self.hex_dump = enabled;
        self
    }

    fn spec(&self) -> PortSpec {
        PortSpec::new(self.port.clone().unwrap_or_else(|| "mock".to_string()))
            .with_baud_rate(self.baud_rate)
            .with_read_timeout(self.response_timeout)
    }

    /// 构建并连接
    ///
    /// # Errors
    /// - `DriverError::Transport`: 串口打开失败
    /// - `DriverError::Unsupported`: 所选后端未编译
    pub fn build(self) -> Result<CommandExecutor, DriverError> {
        match self.driver_type {
            DriverType::Serial => {
                #[cfg(feature = "serial")]
                {
                    if self.port.is_none() {
                        return Err(DriverError::Unsupported(
                            "serial driver requires a port name".to_string(),
                        ));
                    }
                    self.build_with_transport(dobot_serial::SerialPortTransport::new())
                }
                #[cfg(not(feature = "serial"))]
                {
                    Err(DriverError::Unsupported(
                        "serial feature disabled".to_string(),
                    ))
                }
            },
            DriverType::Mock => {
                #[cfg(feature = "mock")]
                {
                    self.build_with_transport(dobot_serial::MockDobot::new())
                }
                #[cfg(not(feature = "mock"))]
                {
                    Err(DriverError::Unsupported("mock feature disabled".to_string()))
                }
            },
        }
    }

    /// 使用调用方提供的传输构建并连接
    pub fn build_with_transport(
        self,
        transport: impl Transport + 'static,
    ) -> Result<CommandExecutor, DriverError> {
        let spec = self.spec();
        let executor = CommandExecutor::new(transport).with_response_timeout(self.response_timeout);
        if self.hex_dump {
            executor.add_hook(Arc::new(HexDumpHook));
        }
        executor.connect(&spec)?;
        info!(
            "Dobot connected on '{}' ({} baud, {:?} driver)",
            spec.port_name, spec.baud_rate, self.driver_type
        );
        Ok(executor)
    }
}
