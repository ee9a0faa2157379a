//! 命令定义和实现

pub mod config;
pub mod device;
pub mod run;

pub use config::ConfigCommand;
pub use device::DeviceCommand;
pub use run::RunCommand;
