//! 抓取放置控制层
//!
//! 在 `RobotController` 之上组织完整的分拣流程：
//!
//! - `correlation`: 通用请求/应答关联表
//! - `detection`: 颜色识别请求与结果的关联
//! - `stack`: 各颜色堆叠计数
//! - `heights`: 堆叠层数到 z 坐标的换算
//! - `movement`: 抓取、拍照、放置运动序列
//! - `orchestrator`: 逐块执行的状态机
//! - `config`: TOML 配置
//! - `delay`: 可替换的物理稳定等待

pub mod config;
pub mod correlation;
pub mod delay;
pub mod detection;
pub mod heights;
pub mod movement;
pub mod orchestrator;
pub mod stack;

pub use config::{
    ConfigError, PhysicalConstants, PickAndPlaceConfig, RobotPositions, SerialConfig, Timings,
};
pub use correlation::{CorrelationError, Correlator, PendingRequest};
pub use delay::{Delay, NoDelay, RecordingDelay, SpinDelay};
pub use detection::{
    ChannelRequester, ClassificationRequest, ClassificationRequester, Color, ColorDetected,
    DetectionCorrelator, DetectionError, PendingDetection, UnknownColor,
};
pub use heights::HeightCalculator;
pub use movement::RobotMovementService;
pub use orchestrator::{
    AbortCause, AtomicCubeState, CubeOutcome, CubeState, OrchestratorError,
    PickAndPlaceOrchestrator,
};
pub use stack::{StackInfo, StackTracker};
