//! 按颜色统计的堆叠高度

use crate::detection::Color;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

/// 一次变更后的堆叠状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackInfo {
    pub color: Color,
    pub height: i32,
}

/// 堆叠计数器
///
/// 所有颜色的计数在同一把锁下修改，每个操作都是原子的。
/// 移除方块不做下限检查，计数可以为负。
#[derive(Debug)]
pub struct StackTracker {
    heights: Mutex<BTreeMap<Color, i32>>,
}

impl Default for StackTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StackTracker {
    pub fn new() -> Self {
        Self {
            heights: Mutex::new(Color::ALL.into_iter().map(|c| (c, 0)).collect()),
        }
    }

    /// 放上一块，返回放置后的高度
    pub fn add_cube(&self, color: Color) -> StackInfo {
        let mut heights = self.heights.lock();
        let height = heights.entry(color).or_insert(0);
        *height += 1;
        debug!("{} stack height -> {}", color, height);
        StackInfo {
            color,
            height: *height,
        }
    }

    pub fn remove_cube(&self, color: Color) -> StackInfo {
        let mut heights = self.heights.lock();
        let height = heights.entry(color).or_insert(0);
        *height -= 1;
        debug!("{} stack height -> {}", color, height);
        StackInfo {
            color,
            height: *height,
        }
    }

    pub fn reset(&self) {
        self.heights.lock().values_mut().for_each(|h| *h = 0);
    }

    pub fn height(&self, color: Color) -> i32 {
        self.heights.lock().get(&color).copied().unwrap_or(0)
    }

    /// 所有颜色中的最高堆叠
    pub fn max_height(&self) -> i32 {
        self.heights.lock().values().copied().max().unwrap_or(0)
    }

    pub fn snapshot(&self) -> Vec<StackInfo> {
        self.heights
            .lock()
            .iter()
            .map(|(&color, &height)| StackInfo { color, height })
            .collect()
    }
}
