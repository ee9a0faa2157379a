//! 颜色识别关联
//!
//! 编排流程发出带关联 id 的识别请求，外部分类器在另一个线程里
//! 用同一个 id 回报颜色。

use crate::correlation::{CorrelationError, Correlator, PendingRequest};
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 方块颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
            Color::Yellow => "YELLOW",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown color label: '{0}'")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    /// 不区分大小写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Color::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| UnknownColor(label.to_string()))
    }
}

/// 发往分类器的识别请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub correlation_id: u64,
}

/// 分类器回报的识别结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDetected {
    pub correlation_id: u64,
    pub color: Color,
}

/// 识别层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("Color detection timed out for request {correlation_id} after {timeout_ms}ms")]
    Timeout { correlation_id: u64, timeout_ms: u64 },

    #[error("Failed to publish classification request {correlation_id}: {reason}")]
    RequestFailed { correlation_id: u64, reason: String },
}

impl From<CorrelationError> for DetectionError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::Timeout { id, timeout_ms } => DetectionError::Timeout {
                correlation_id: id,
                timeout_ms,
            },
        }
    }
}

/// 识别请求的发送端
pub trait ClassificationRequester: Send + Sync {
    fn request_classification(&self, request: ClassificationRequest) -> Result<(), String>;
}

/// 通过 crossbeam 通道发布识别请求
///
/// 接收端只在构造时交出一次，由分类器线程持有；接收端被丢弃后请求会失败。
#[derive(Debug, Clone)]
pub struct ChannelRequester {
    tx: Sender<ClassificationRequest>,
}

impl ChannelRequester {
    pub fn new() -> (Self, Receiver<ClassificationRequest>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl ClassificationRequester for ChannelRequester {
    fn request_classification(&self, request: ClassificationRequest) -> Result<(), String> {
        self.tx.send(request).map_err(|e| e.to_string())
    }
}

/// 颜色识别关联器
#[derive(Clone)]
pub struct DetectionCorrelator {
    correlator: Correlator<Color>,
    requester: Arc<dyn ClassificationRequester>,
}

impl DetectionCorrelator {
    pub fn new(requester: Arc<dyn ClassificationRequester>) -> Self {
        Self {
            correlator: Correlator::new(),
            requester,
        }
    }

    /// 登记请求并通知分类器
    ///
    /// 通知失败时请求立即注销。
    pub fn begin_request(&self) -> Result<PendingDetection, DetectionError> {
        let pending = self.correlator.register();
        let correlation_id = pending.id();
        self.requester
            .request_classification(ClassificationRequest { correlation_id })
            .map_err(|reason| {
                warn!("Classification request {} failed: {}", correlation_id, reason);
                DetectionError::RequestFailed {
                    correlation_id,
                    reason,
                }
            })?;
        info!("Requested color classification (correlation id {})", correlation_id);
        Ok(PendingDetection { pending })
    }

    /// 完成请求；id 未知或已超时时返回 `false`
    pub fn complete(&self, correlation_id: u64, color: Color) -> bool {
        let resolved = self.correlator.complete(correlation_id, color);
        if resolved {
            debug!("Color {} detected for request {}", color, correlation_id);
        }
        resolved
    }

    /// 用分类器的原始标签完成请求
    pub fn complete_label(&self, correlation_id: u64, label: &str) -> bool {
        match label.parse::<Color>() {
            Ok(color) => self.complete(correlation_id, color),
            Err(e) => {
                warn!("Ignoring result for request {}: {}", correlation_id, e);
                false
            },
        }
    }

    pub fn handle(&self, event: ColorDetected) -> bool {
        self.complete(event.correlation_id, event.color)
    }

    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }
}

/// 等待中的识别请求
#[derive(Debug)]
pub struct PendingDetection {
    pending: PendingRequest<Color>,
}

impl PendingDetection {
    pub fn correlation_id(&self) -> u64 {
        self.pending.id()
    }

    pub fn wait(self, timeout: Duration) -> Result<Color, DetectionError> {
        Ok(self.pending.wait(timeout)?)
    }
}
