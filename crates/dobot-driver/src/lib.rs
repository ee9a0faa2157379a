//! 驱动层模块
//!
//! 本模块提供 Dobot 机械臂的请求/应答执行功能，包括：
//! - 串口独占访问（一次只有一个在途请求）
//! - 应答帧重组、校验与解析
//! - 原子计数器指标
//! - 钩子系统：收发帧回调（如十六进制转储）
//!
//! 大多数用户应该使用 `dobot-client` 提供的 `RobotController`。

mod builder;
mod error;
mod executor;
pub mod hooks;
pub mod metrics;

pub use builder::{DobotBuilder, DriverType};
pub use error::DriverError;
pub use executor::CommandExecutor;
pub use hooks::{FrameCallback, HexDumpHook, HookManager};
pub use metrics::{DriverMetrics, MetricsSnapshot};
