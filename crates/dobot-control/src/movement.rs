//! 抓取、拍照、放置的运动序列
//!
//! 每段序列先停止并清空设备队列，再把运动指令以排队方式下发，
//! 最后启动队列让机械臂连续执行。

use crate::config::{PhysicalConstants, PickAndPlaceConfig, RobotPositions};
use crate::detection::Color;
use crate::heights::HeightCalculator;
use dobot_client::{DriverError, MovementProfile, PtpMode, RobotController};
use tracing::{debug, info};

/// 运动序列服务
#[derive(Clone)]
pub struct RobotMovementService {
    robot: RobotController,
    fast: MovementProfile,
    slow: MovementProfile,
    positions: RobotPositions,
    physical: PhysicalConstants,
    heights: HeightCalculator,
}

impl RobotMovementService {
    pub fn new(robot: RobotController, config: &PickAndPlaceConfig) -> Self {
        Self {
            robot,
            fast: config.fast,
            slow: config.slow,
            positions: config.positions,
            physical: config.physical,
            heights: config.physical.heights(),
        }
    }

    pub fn robot(&self) -> &RobotController {
        &self.robot
    }

    pub fn heights(&self) -> &HeightCalculator {
        &self.heights
    }

    fn fast_profile(&self) -> Result<(), DriverError> {
        self.robot.apply_movement_profile(self.fast, true)
    }

    fn slow_profile(&self) -> Result<(), DriverError> {
        self.robot.apply_movement_profile(self.slow, true)
    }

    fn reset_queue(&self) -> Result<(), DriverError> {
        self.robot.stop_queue()?;
        self.robot.clear_queue()
    }

    /// 把起始点设为回零点并回零
    pub fn initialize(&self) -> Result<(), DriverError> {
        info!("Initializing robot at start point {}", self.positions.start_point);
        self.reset_queue()?;
        self.robot
            .set_home_position(self.positions.start_point, true)?;
        self.fast_profile()?;
        self.robot.go_home(true)?;
        self.robot.start_queue()
    }

    /// 从抓取点吸起第 `position` 层方块
    pub fn pickup_cube(&self, position: i32) -> Result<(), DriverError> {
        let pickup = self.positions.pickup_point;
        let approach_z = self.heights.approach(position);
        let pickup_z = self.heights.pickup(position);
        debug!(
            "Pickup cube at level {}: approach z={}, pickup z={}",
            position, approach_z, pickup_z
        );

        self.reset_queue()?;
        self.fast_profile()?;
        self.robot
            .move_to(PtpMode::MovjXyz, pickup.with_z(approach_z), true)?;
        self.slow_profile()?;
        self.robot
            .move_to(PtpMode::MovlXyz, pickup.with_z(pickup_z), true)?;
        self.robot.set_vacuum(true, true)
    }

    /// 抬起方块移到相机位
    pub fn move_to_camera(&self) -> Result<(), DriverError> {
        debug!("Moving to camera at {}", self.positions.camera);
        self.fast_profile()?;
        self.robot
            .set_lift_height(self.physical.cube_height, self.physical.max_height, true)?;
        self.robot
            .move_to(PtpMode::JumpXyz, self.positions.camera, true)?;
        self.robot.start_queue()
    }

    /// 把方块放到 `color` 堆的第 `height` 层，然后回到起始点
    ///
    /// `max_stack` 是当前最高堆叠，用来算出越过所有堆叠的抬升量。
    pub fn place_cube(&self, color: Color, height: i32, max_stack: i32) -> Result<(), DriverError> {
        let target = self.positions.storage(color);
        let approach_z = self.heights.approach(height);
        let place_z = self.heights.pickup(height);
        let max_height = self.physical.max_height;
        debug!(
            "Placing {} cube at level {} (approach z={}, place z={}, max stack {})",
            color, height, approach_z, place_z, max_stack
        );

        self.reset_queue()?;
        self.fast_profile()?;
        self.robot.set_lift_height(
            self.heights.lift(self.positions.camera.z, max_stack),
            max_height,
            true,
        )?;
        self.robot
            .move_to(PtpMode::JumpXyz, target.with_z(approach_z), true)?;
        self.slow_profile()?;
        self.robot
            .move_to(PtpMode::MovlXyz, target.with_z(place_z), true)?;
        self.robot.set_vacuum(false, true)?;

        self.fast_profile()?;
        self.robot
            .set_lift_height(self.heights.lift(place_z, max_stack), max_height, true)?;
        self.robot
            .move_to(PtpMode::JumpXyz, self.positions.start_point, true)?;
        self.robot.start_queue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dobot_client::CommandExecutor;
    use dobot_protocol::{Command, LiftParams};
    use dobot_serial::{MockDobot, PortSpec};
    use std::time::Duration;

    fn service() -> (RobotMovementService, MockDobot, PickAndPlaceConfig) {
        let mock = MockDobot::new();
        let executor =
            CommandExecutor::new(mock.clone()).with_response_timeout(Duration::from_millis(50));
        let robot = RobotController::from_executor(executor);
        robot.connect(&PortSpec::new("mock")).unwrap();
        let config = PickAndPlaceConfig::default();
        (RobotMovementService::new(robot, &config), mock, config)
    }

    #[test]
    fn test_initialize_sequence() {
        let (service, mock, config) = service();
        service.initialize().unwrap();
        assert_eq!(
            mock.commands(),
            vec![
                Command::StopQueue,
                Command::ClearQueue,
                Command::SetHomeParams {
                    position: config.positions.start_point,
                    queued: true
                },
                Command::SetPtpCoordinateParams {
                    profile: config.fast,
                    queued: true
                },
                Command::SetHomeCmd { queued: true },
                Command::StartQueue,
            ]
        );
    }

    #[test]
    fn test_pickup_sequence() {
        let (service, mock, config) = service();
        service.pickup_cube(2).unwrap();

        let pickup = config.positions.pickup_point;
        assert_eq!(
            mock.commands(),
            vec![
                Command::StopQueue,
                Command::ClearQueue,
                Command::SetPtpCoordinateParams {
                    profile: config.fast,
                    queued: true
                },
                Command::SetPtpCmd {
                    mode: PtpMode::MovjXyz,
                    target: pickup.with_z(-12.0),
                    queued: true
                },
                Command::SetPtpCoordinateParams {
                    profile: config.slow,
                    queued: true
                },
                Command::SetPtpCmd {
                    mode: PtpMode::MovlXyz,
                    target: pickup.with_z(-15.5),
                    queued: true
                },
                Command::SetSuctionCup {
                    enabled: true,
                    queued: true
                },
            ]
        );
        assert!(mock.state().suction);
    }

    #[test]
    fn test_move_to_camera_sequence() {
        let (service, mock, config) = service();
        service.move_to_camera().unwrap();
        let commands = mock.commands();
        assert_eq!(
            commands[1],
            Command::SetPtpJumpParams {
                params: LiftParams::new(26.0, 150.0),
                queued: true
            }
        );
        assert_eq!(
            commands[2],
            Command::SetPtpCmd {
                mode: PtpMode::JumpXyz,
                target: config.positions.camera,
                queued: true
            }
        );
        assert_eq!(commands.last(), Some(&Command::StartQueue));
        assert!(mock.state().queue_running);
    }

    #[test]
    fn test_place_sequence_returns_to_start() {
        let (service, mock, config) = service();
        service.place_cube(Color::Green, 1, 1).unwrap();

        let green = config.positions.green;
        let targets: Vec<_> = mock
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::SetPtpCmd { mode, target, .. } => Some((mode, target)),
                _ => None,
            })
            .collect();
        assert_eq!(
            targets,
            vec![
                (PtpMode::JumpXyz, green.with_z(-38.0)),
                (PtpMode::MovlXyz, green.with_z(-40.75)),
                (PtpMode::JumpXyz, config.positions.start_point),
            ]
        );

        let commands = mock.commands();
        // 从相机位 z=40 越过一层堆叠
        assert!(commands.contains(&Command::SetPtpJumpParams {
            params: LiftParams::new(12.0, 150.0),
            queued: true
        }));
        // 从放置高度 z=-40.75 抬起
        assert!(commands.contains(&Command::SetPtpJumpParams {
            params: LiftParams::new(92.75, 150.0),
            queued: true
        }));
        assert!(commands.contains(&Command::SetSuctionCup {
            enabled: false,
            queued: true
        }));
        assert_eq!(commands.last(), Some(&Command::StartQueue));
    }

    #[test]
    fn test_failure_stops_sequence() {
        let (service, mock, _config) = service();
        mock.drop_responses(1);
        let err = service.pickup_cube(1).unwrap_err();
        assert!(matches!(err, DriverError::NoResponse { .. }));
        assert_eq!(mock.commands(), vec![Command::StopQueue]);
    }
}
