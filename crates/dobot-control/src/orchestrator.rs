//! 抓取放置编排
//!
//! 按堆叠层数从高到低依次处理方块，每块经历：
//! `Idle → PickingUp → MovingToCamera → AwaitingColor → Placing → Returning → Idle`。
//! 方块之间严格串行；任一步失败都会终止整个流程，不做重试。

use crate::config::{PickAndPlaceConfig, Timings};
use crate::delay::{Delay, SpinDelay};
use crate::detection::{ClassificationRequester, Color, DetectionCorrelator, DetectionError};
use crate::movement::RobotMovementService;
use crate::stack::StackTracker;
use dobot_client::{DriverError, RobotController};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{JoinHandle, spawn};
use thiserror::Error;
use tracing::{error, info};

/// 单个方块的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CubeState {
    #[default]
    Idle = 0,
    PickingUp = 1,
    MovingToCamera = 2,
    AwaitingColor = 3,
    Placing = 4,
    Returning = 5,
}

impl CubeState {
    /// 无效值视为 Idle
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::PickingUp,
            2 => Self::MovingToCamera,
            3 => Self::AwaitingColor,
            4 => Self::Placing,
            5 => Self::Returning,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

impl fmt::Display for CubeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::PickingUp => "PickingUp",
            Self::MovingToCamera => "MovingToCamera",
            Self::AwaitingColor => "AwaitingColor",
            Self::Placing => "Placing",
            Self::Returning => "Returning",
        };
        f.write_str(name)
    }
}

/// 处理阶段（原子版本，供其他线程观察）
#[derive(Debug, Default)]
pub struct AtomicCubeState {
    inner: AtomicU8,
}

impl AtomicCubeState {
    pub fn new(state: CubeState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> CubeState {
        CubeState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: CubeState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }
}

/// 一块方块的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeOutcome {
    /// 在抓取点堆叠中的层数
    pub cube_index: u32,
    pub color: Color,
    /// 放置后该颜色堆叠的高度
    pub stack_height: i32,
    pub correlation_id: u64,
}

/// 中止原因
#[derive(Error, Debug)]
pub enum AbortCause {
    #[error(transparent)]
    Command(#[from] DriverError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("Stop requested")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Sequence aborted at cube {cube_index} ({state}): {cause}")]
    SequenceAborted {
        cube_index: u32,
        state: CubeState,
        #[source]
        cause: AbortCause,
    },

    #[error("Cube count must be positive, got {0}")]
    InvalidCubeCount(u32),

    #[error("Robot initialization failed: {0}")]
    InitializationFailed(#[source] DriverError),

    #[error("Pick and place is already running")]
    AlreadyRunning,
}

impl OrchestratorError {
    pub fn is_detection_timeout(&self) -> bool {
        matches!(
            self,
            OrchestratorError::SequenceAborted {
                cause: AbortCause::Detection(DetectionError::Timeout { .. }),
                ..
            }
        )
    }
}

/// 退出时清除运行标记
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 抓取放置编排器
pub struct PickAndPlaceOrchestrator {
    movement: RobotMovementService,
    detection: DetectionCorrelator,
    stack: Arc<StackTracker>,
    timings: Timings,
    delay: Arc<dyn Delay>,
    state: AtomicCubeState,
    stop_requested: AtomicBool,
    running: AtomicBool,
}

impl PickAndPlaceOrchestrator {
    pub fn new(
        movement: RobotMovementService,
        detection: DetectionCorrelator,
        stack: Arc<StackTracker>,
        timings: Timings,
    ) -> Self {
        Self {
            movement,
            detection,
            stack,
            timings,
            delay: Arc::new(SpinDelay),
            state: AtomicCubeState::new(CubeState::Idle),
            stop_requested: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    /// 由配置组装全部组件
    pub fn from_config(
        robot: RobotController,
        config: &PickAndPlaceConfig,
        requester: Arc<dyn ClassificationRequester>,
    ) -> Self {
        Self::new(
            RobotMovementService::new(robot, config),
            DetectionCorrelator::new(requester),
            Arc::new(StackTracker::new()),
            config.timings,
        )
    }

    /// 替换等待实现（测试中使用 `NoDelay`）
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn detection(&self) -> &DetectionCorrelator {
        &self.detection
    }

    pub fn stack(&self) -> &Arc<StackTracker> {
        &self.stack
    }

    pub fn current_state(&self) -> CubeState {
        self.state.get(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 请求在下一步开始前停止
    pub fn request_stop(&self) {
        info!("Stop requested");
        self.stop_requested.store(true, Ordering::Release);
    }

    /// 处理 `cube_count` 块方块
    ///
    /// # Errors
    /// - `InvalidCubeCount`: `cube_count` 为 0
    /// - `InitializationFailed`: 回零失败
    /// - `SequenceAborted`: 某块方块处理失败，之后的方块不再处理
    pub fn start_pick_and_place(
        &self,
        cube_count: u32,
    ) -> Result<Vec<CubeOutcome>, OrchestratorError> {
        if cube_count == 0 {
            return Err(OrchestratorError::InvalidCubeCount(cube_count));
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(OrchestratorError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);
        self.stop_requested.store(false, Ordering::Release);

        info!("Starting pick and place with {} cubes", cube_count);
        self.movement
            .initialize()
            .map_err(OrchestratorError::InitializationFailed)?;
        self.stack.reset();
        self.delay
            .wait("initial stabilization", self.timings.initial_delay());

        let mut outcomes = Vec::with_capacity(cube_count as usize);
        for cube_index in (1..=cube_count).rev() {
            match self.process_cube(cube_index) {
                Ok(outcome) => {
                    info!(
                        "Cube {} placed on {} stack (height {})",
                        cube_index, outcome.color, outcome.stack_height
                    );
                    outcomes.push(outcome);
                },
                Err((state, cause)) => {
                    self.state.set(CubeState::Idle, Ordering::Release);
                    error!("Cube {} failed in {}: {}", cube_index, state, cause);
                    return Err(OrchestratorError::SequenceAborted {
                        cube_index,
                        state,
                        cause,
                    });
                },
            }
        }

        info!("Pick and place finished: {} cubes sorted", outcomes.len());
        Ok(outcomes)
    }

    /// 在后台线程上运行，固定等待不会阻塞调用方
    pub fn spawn_pick_and_place(
        self: &Arc<Self>,
        cube_count: u32,
    ) -> JoinHandle<Result<Vec<CubeOutcome>, OrchestratorError>> {
        let orchestrator = self.clone();
        spawn(move || orchestrator.start_pick_and_place(cube_count))
    }

    fn enter(&self, state: CubeState) -> Result<(), (CubeState, AbortCause)> {
        if self.stop_requested.load(Ordering::Acquire) {
            return Err((state, AbortCause::Cancelled));
        }
        self.state.set(state, Ordering::Release);
        Ok(())
    }

    fn process_cube(&self, cube_index: u32) -> Result<CubeOutcome, (CubeState, AbortCause)> {
        let level = cube_index as i32;
        let step = |state: CubeState| move |e: DriverError| (state, AbortCause::from(e));

        self.enter(CubeState::PickingUp)?;
        info!("Picking up cube {}", cube_index);
        self.movement
            .pickup_cube(level)
            .map_err(step(CubeState::PickingUp))?;

        self.enter(CubeState::MovingToCamera)?;
        self.movement
            .move_to_camera()
            .map_err(step(CubeState::MovingToCamera))?;

        self.enter(CubeState::AwaitingColor)?;
        self.delay.wait("camera settle", self.timings.camera_settle());
        let detect = |e: DetectionError| (CubeState::AwaitingColor, AbortCause::from(e));
        let pending = self.detection.begin_request().map_err(detect)?;
        let correlation_id = pending.correlation_id();
        let color = pending
            .wait(self.timings.detection_timeout())
            .map_err(detect)?;
        info!("Cube {} is {}", cube_index, color);

        self.enter(CubeState::Placing)?;
        let placed = self.stack.add_cube(color);
        let max_stack = self.stack.max_height().max(level);
        self.movement
            .place_cube(color, placed.height, max_stack)
            .map_err(step(CubeState::Placing))?;

        self.state.set(CubeState::Returning, Ordering::Release);
        self.delay.wait("return settle", self.timings.return_settle());
        self.state.set(CubeState::Idle, Ordering::Release);

        Ok(CubeOutcome {
            cube_index,
            color,
            stack_height: placed.height,
            correlation_id,
        })
    }
}
