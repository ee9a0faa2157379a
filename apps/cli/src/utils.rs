//! 配置加载与连接

use anyhow::{Context, Result};
use dobot_client::{DobotBuilder, DriverType, RobotController};
use dobot_control::PickAndPlaceConfig;
use std::path::PathBuf;

/// 所有子命令共享的连接参数
#[derive(Debug, Clone, Default)]
pub struct ConnectionArgs {
    pub config: Option<PathBuf>,
    pub port: Option<String>,
    pub mock: bool,
    pub hex_dump: bool,
}

impl ConnectionArgs {
    /// 加载配置并应用命令行覆盖
    pub fn load_config(&self) -> Result<PickAndPlaceConfig> {
        let mut config = match &self.config {
            Some(path) => PickAndPlaceConfig::load(path)
                .with_context(|| format!("加载配置失败: {}", path.display()))?,
            None => PickAndPlaceConfig::default(),
        };
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        Ok(config)
    }

    pub fn connect(&self, config: &PickAndPlaceConfig) -> Result<RobotController> {
        let driver_type = if self.mock {
            DriverType::Mock
        } else {
            DriverType::Serial
        };

        println!("🔌 连接到 Dobot ({})...", config.serial.port);
        let executor = DobotBuilder::new()
            .with_driver_type(driver_type)
            .port(config.serial.port.clone())
            .baud_rate(config.serial.baud_rate)
            .response_timeout(config.serial.response_timeout())
            .hex_dump(self.hex_dump)
            .build()
            .with_context(|| format!("无法连接串口 {}", config.serial.port))?;
        Ok(RobotController::from_executor(executor))
    }
}
