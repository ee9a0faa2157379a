//! 客户端接口模块
//!
//! `RobotController` 把协议指令包装成具名操作（回零、移动、吸盘、队列控制等）。
//! 每个操作返回 `Result<_, DriverError>`，失败时以 `warn` 级别记录操作名，
//! 调用方只关心成败时可以直接用 `.is_ok()`。

mod controller;

pub use controller::RobotController;

pub use dobot_driver::{CommandExecutor, DobotBuilder, DriverError, DriverType};
pub use dobot_protocol::{LiftParams, MovementProfile, Position, PtpMode};
