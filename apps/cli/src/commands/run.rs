//! run 命令
//!
//! 执行抓取放置。颜色由操作员在终端输入：每收到一个识别请求，
//! 打印请求 id 并读取一行颜色标签。

use anyhow::{Context, Result, anyhow};
use clap::Args;
use dobot_control::{
    ChannelRequester, ClassificationRequest, Color, DetectionCorrelator, NoDelay,
    PickAndPlaceOrchestrator,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use tracing::warn;

use crate::utils::ConnectionArgs;

/// 抓取放置命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 抓取点堆叠的方块数
    #[arg(short = 'n', long)]
    pub cubes: u32,

    /// 跳过物理稳定等待（配合 --mock 调试）
    #[arg(long)]
    pub skip_delays: bool,
}

impl RunCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let config = connection.load_config()?;
        let robot = connection.connect(&config)?;

        let (requester, requests) = ChannelRequester::new();
        let mut orchestrator =
            PickAndPlaceOrchestrator::from_config(robot.clone(), &config, Arc::new(requester));
        if self.skip_delays {
            orchestrator = orchestrator.with_delay(Arc::new(NoDelay));
        }
        let orchestrator = Arc::new(orchestrator);

        {
            let orchestrator = orchestrator.clone();
            ctrlc::set_handler(move || {
                println!();
                println!("🛑 收到 Ctrl-C，当前步骤完成后停止");
                orchestrator.request_stop();
            })
            .context("设置 Ctrl-C 处理失败")?;
        }

        let detection = orchestrator.detection().clone();
        thread::spawn(move || {
            let stdin = io::stdin();
            if let Err(e) = operator_loop(requests, &detection, stdin.lock()) {
                warn!("Operator input failed: {}", e);
            }
        });

        println!("📦 开始分拣 {} 块方块", self.cubes);
        let result = orchestrator
            .spawn_pick_and_place(self.cubes)
            .join()
            .map_err(|_| anyhow!("分拣线程异常退出"))?;
        robot.disconnect();

        let outcomes = result.context("分拣中止")?;
        println!();
        println!("📊 分拣结果:");
        for outcome in &outcomes {
            println!(
                "  方块 {}: {} (堆叠高度 {}, 请求 #{})",
                outcome.cube_index, outcome.color, outcome.stack_height, outcome.correlation_id
            );
        }
        Ok(())
    }
}

/// 逐个回答识别请求
///
/// 输入结束时返回；无效标签会重新提示。
fn operator_loop(
    requests: impl IntoIterator<Item = ClassificationRequest>,
    detection: &DetectionCorrelator,
    mut input: impl BufRead,
) -> io::Result<()> {
    for request in requests {
        let id = request.correlation_id;
        loop {
            print!("📷 请求 #{}: 输入颜色 (RED/GREEN/BLUE/YELLOW): ", id);
            io::stdout().flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            match line.parse::<Color>() {
                Ok(color) => {
                    if !detection.complete(id, color) {
                        println!("⚠️  请求 #{} 已超时，结果被丢弃", id);
                    }
                    break;
                },
                Err(e) => println!("⚠️  {}", e),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn test_operator_answers_requests() {
        let (requester, _requests) = ChannelRequester::new();
        let detection = DetectionCorrelator::new(Arc::new(requester));
        let first = detection.begin_request().unwrap();
        let second = detection.begin_request().unwrap();
        let requests = vec![
            ClassificationRequest {
                correlation_id: first.correlation_id(),
            },
            ClassificationRequest {
                correlation_id: second.correlation_id(),
            },
        ];

        // 第一行无效，重新提示
        let input = Cursor::new("purple\nred\nYellow\n");
        operator_loop(requests, &detection, input).unwrap();

        assert_eq!(first.wait(Duration::from_millis(1)), Ok(Color::Red));
        assert_eq!(second.wait(Duration::from_millis(1)), Ok(Color::Yellow));
    }

    #[test]
    fn test_operator_stops_at_end_of_input() {
        let (requester, _requests) = ChannelRequester::new();
        let detection = DetectionCorrelator::new(Arc::new(requester));
        let pending = detection.begin_request().unwrap();
        let requests = vec![ClassificationRequest {
            correlation_id: pending.correlation_id(),
        }];

        operator_loop(requests, &detection, Cursor::new("")).unwrap();
        assert_eq!(detection.pending_count(), 1);
    }
}
