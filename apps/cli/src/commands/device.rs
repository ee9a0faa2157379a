//! 单次设备操作
//!
//! 每个命令独立执行：读取配置、连接、执行、断开。

use anyhow::{Context, Result};
use dobot_client::RobotController;

use crate::utils::ConnectionArgs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    Info,
    Home,
    SetName(String),
    Profile,
}

impl DeviceCommand {
    pub fn execute(self, connection: &ConnectionArgs) -> Result<()> {
        let config = connection.load_config()?;
        let robot = connection.connect(&config)?;
        let result = self.run(&robot);
        robot.disconnect();
        result
    }

    fn run(self, robot: &RobotController) -> Result<()> {
        match self {
            DeviceCommand::Info => {
                let serial = robot.get_device_serial().context("读取序列号失败")?;
                let name = robot.get_device_name().context("读取设备名失败")?;
                println!("序列号: {}", serial);
                println!("设备名: {}", name);
                Ok(())
            },
            DeviceCommand::Home => {
                println!("🏠 回零...");
                robot.go_home(false).context("回零失败")?;
                println!("✅ 回零指令已发送");
                Ok(())
            },
            DeviceCommand::SetName(name) => {
                robot.set_device_name(&name).context("设置设备名失败")?;
                println!("✅ 设备名: {}", name);
                Ok(())
            },
            DeviceCommand::Profile => {
                let profile = robot.get_movement_profile().context("读取运动参数失败")?;
                println!("XYZ 速度:   {}", profile.xyz_velocity);
                println!("R 速度:     {}", profile.r_velocity);
                println!("XYZ 加速度: {}", profile.xyz_acceleration);
                println!("R 加速度:   {}", profile.r_acceleration);
                Ok(())
            },
        }
    }
}
