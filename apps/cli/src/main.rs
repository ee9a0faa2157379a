//! # Dobot CLI
//!
//! Command-line interface for Dobot pick-and-place.
//!
//! ```bash
//! # 查看设备信息
//! dobot-cli --port /dev/ttyUSB0 info
//!
//! # 使用配置文件分拣 4 块方块（操作员在终端输入颜色）
//! dobot-cli --config dobot.toml run --cubes 4
//!
//! # 打印生效的配置
//! dobot-cli --config dobot.toml config show
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod utils;

use commands::{ConfigCommand, DeviceCommand, RunCommand};
use utils::ConnectionArgs;

/// Dobot CLI - 抓取放置命令行工具
#[derive(Parser, Debug)]
#[command(name = "dobot-cli")]
#[command(about = "Command-line interface for Dobot pick-and-place", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（TOML），缺省使用内置默认值
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 串口（覆盖配置）
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// 使用模拟设备（需要 `mock` feature）
    #[arg(long, global = true)]
    mock: bool,

    /// 在 trace 级别记录原始帧
    #[arg(long, global = true)]
    hex_dump: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 读取序列号和设备名
    Info,

    /// 回到零位
    Home,

    /// 设置设备名
    SetName {
        /// 新名称
        name: String,
    },

    /// 读取当前运动参数
    Profile,

    /// 执行抓取放置
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dobot_cli=info".parse()?)
                .add_directive("dobot_control=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let connection = ConnectionArgs {
        config: cli.config,
        port: cli.port,
        mock: cli.mock,
        hex_dump: cli.hex_dump,
    };

    match cli.command {
        Commands::Info => DeviceCommand::Info.execute(&connection),
        Commands::Home => DeviceCommand::Home.execute(&connection),
        Commands::SetName { name } => DeviceCommand::SetName(name).execute(&connection),
        Commands::Profile => DeviceCommand::Profile.execute(&connection),
        Commands::Run { args } => args.execute(&connection),
        Commands::Config(cmd) => cmd.execute(&connection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "dobot-cli", "--port", "COM3", "--mock", "run", "--cubes", "3", "--skip-delays",
        ])
        .unwrap();
        assert_eq!(cli.port.as_deref(), Some("COM3"));
        assert!(cli.mock);
        match cli.command {
            Commands::Run { args } => {
                assert_eq!(args.cubes, 3);
                assert!(args.skip_delays);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["dobot-cli", "config", "show", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_run_requires_cube_count() {
        assert!(Cli::try_parse_from(["dobot-cli", "run"]).is_err());
    }
}
