//! 具名机械臂操作

use dobot_driver::{CommandExecutor, DriverError, MetricsSnapshot};
use dobot_protocol::{Command, LiftParams, MovementProfile, Position, PtpMode, Response};
use dobot_serial::PortSpec;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 机械臂控制器
///
/// 持有 `Arc<CommandExecutor>`，可以克隆后跨线程使用；
/// 串口上的请求始终由执行器串行化。
#[derive(Clone)]
pub struct RobotController {
    executor: Arc<CommandExecutor>,
}

impl RobotController {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }

    pub fn from_executor(executor: CommandExecutor) -> Self {
        Self::new(Arc::new(executor))
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    fn run(&self, operation: &'static str, command: Command) -> Result<Response, DriverError> {
        debug!("{}: {:?}", operation, command);
        self.executor
            .execute(&command)
            .inspect_err(|e| warn!("{} failed: {}", operation, e))
    }

    fn run_unit(&self, operation: &'static str, command: Command) -> Result<(), DriverError> {
        self.run(operation, command).map(|_| ())
    }

    fn unexpected(operation: &'static str, command: &Command, response: Response) -> DriverError {
        let err = DriverError::UnexpectedResponse {
            command: command.command_id(),
            response: format!("{response:?}"),
        };
        warn!("{} failed: {}", operation, err);
        err
    }

    fn run_text(&self, operation: &'static str, command: Command) -> Result<String, DriverError> {
        match self.run(operation, command.clone())? {
            Response::Text(text) => Ok(text),
            other => Err(Self::unexpected(operation, &command, other)),
        }
    }

    // ==================== 连接 ====================

    pub fn connect(&self, spec: &PortSpec) -> Result<(), DriverError> {
        if self.is_connected() {
            info!("Already connected to Dobot");
            return Ok(());
        }
        self.executor
            .connect(spec)
            .inspect_err(|e| warn!("connect to '{}' failed: {}", spec.port_name, e))
    }

    pub fn disconnect(&self) {
        self.executor.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.executor.is_connected()
    }

    /// 读取序列号验证通信；序列号非空即为成功
    pub fn ping(&self) -> bool {
        let ok = self
            .get_device_serial()
            .map(|sn| !sn.is_empty())
            .unwrap_or(false);
        info!("Ping result: {}", if ok { "Success" } else { "Failed" });
        ok
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.executor.metrics().snapshot()
    }

    // ==================== 运动 ====================

    pub fn go_home(&self, queued: bool) -> Result<(), DriverError> {
        self.run_unit("go_home", Command::SetHomeCmd { queued })
    }

    pub fn move_to(&self, mode: PtpMode, target: Position, queued: bool) -> Result<(), DriverError> {
        self.run_unit(
            "move_to",
            Command::SetPtpCmd {
                mode,
                target,
                queued,
            },
        )
    }

    pub fn set_vacuum(&self, enabled: bool, queued: bool) -> Result<(), DriverError> {
        self.run_unit("set_vacuum", Command::SetSuctionCup { enabled, queued })
    }

    pub fn set_movement_profile(
        &self,
        xyz_velocity: f32,
        r_velocity: f32,
        xyz_acceleration: f32,
        r_acceleration: f32,
        queued: bool,
    ) -> Result<(), DriverError> {
        self.apply_movement_profile(
            MovementProfile::new(xyz_velocity, r_velocity, xyz_acceleration, r_acceleration),
            queued,
        )
    }

    pub fn apply_movement_profile(
        &self,
        profile: MovementProfile,
        queued: bool,
    ) -> Result<(), DriverError> {
        self.run_unit(
            "set_movement_profile",
            Command::SetPtpCoordinateParams { profile, queued },
        )
    }

    pub fn get_movement_profile(&self) -> Result<MovementProfile, DriverError> {
        let command = Command::GetPtpCoordinateParams;
        match self.run("get_movement_profile", command.clone())? {
            Response::Profile(profile) => Ok(profile),
            other => Err(Self::unexpected("get_movement_profile", &command, other)),
        }
    }

    pub fn set_home_position(&self, position: Position, queued: bool) -> Result<(), DriverError> {
        self.run_unit(
            "set_home_position",
            Command::SetHomeParams { position, queued },
        )
    }

    pub fn get_home_position(&self) -> Result<Position, DriverError> {
        let command = Command::GetHomeParams;
        match self.run("get_home_position", command.clone())? {
            Response::Position(position) => Ok(position),
            other => Err(Self::unexpected("get_home_position", &command, other)),
        }
    }

    /// 设置门型运动的抬升高度和最大高度
    pub fn set_lift_height(
        &self,
        jump_height: f32,
        max_height: f32,
        queued: bool,
    ) -> Result<(), DriverError> {
        self.run_unit(
            "set_lift_height",
            Command::SetPtpJumpParams {
                params: LiftParams::new(jump_height, max_height),
                queued,
            },
        )
    }

    pub fn get_lift_height(&self) -> Result<LiftParams, DriverError> {
        let command = Command::GetPtpJumpParams;
        match self.run("get_lift_height", command.clone())? {
            Response::Lift(params) => Ok(params),
            other => Err(Self::unexpected("get_lift_height", &command, other)),
        }
    }

    pub fn get_vacuum(&self) -> Result<bool, DriverError> {
        let command = Command::GetSuctionCup;
        match self.run("get_vacuum", command.clone())? {
            Response::Bool(enabled) => Ok(enabled),
            other => Err(Self::unexpected("get_vacuum", &command, other)),
        }
    }

    // ==================== 队列 ====================

    pub fn start_queue(&self) -> Result<(), DriverError> {
        self.run_unit("start_queue", Command::StartQueue)
    }

    pub fn stop_queue(&self) -> Result<(), DriverError> {
        self.run_unit("stop_queue", Command::StopQueue)
    }

    pub fn clear_queue(&self) -> Result<(), DriverError> {
        self.run_unit("clear_queue", Command::ClearQueue)
    }

    // ==================== 设备信息 ====================

    pub fn get_device_serial(&self) -> Result<String, DriverError> {
        self.run_text("get_device_serial", Command::GetDeviceSn)
    }

    pub fn get_device_name(&self) -> Result<String, DriverError> {
        self.run_text("get_device_name", Command::GetDeviceName)
    }

    pub fn set_device_name(&self, name: &str) -> Result<(), DriverError> {
        self.run_unit(
            "set_device_name",
            Command::SetDeviceName {
                name: name.to_string(),
            },
        )
    }
}
