//! 配置管理命令

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::utils::ConnectionArgs;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置
    Show {
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },

    /// 校验配置文件
    Check,
}

impl ConfigCommand {
    pub fn execute(self, connection: &ConnectionArgs) -> Result<()> {
        let config = connection.load_config()?;
        match self {
            ConfigCommand::Show { json } => {
                let text = if json {
                    serde_json::to_string_pretty(&config).context("序列化配置失败")?
                } else {
                    config.to_toml_string().context("序列化配置失败")?
                };
                println!("{}", text);
            },
            ConfigCommand::Check => {
                match &connection.config {
                    Some(path) => println!("配置文件: {}", path.display()),
                    None => println!("配置文件: (内置默认值)"),
                }
                println!("✅ 配置有效");
            },
        }
        Ok(())
    }
}
