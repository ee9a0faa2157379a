//! 堆叠位置对应的 z 高度

/// 高度计算器
///
/// 位置 `p` 表示堆叠中的第几层（从 1 开始）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightCalculator {
    pub absolute_floor: f32,
    pub cube_height: f32,
    pub offset: f32,
}

/// 每层下压量，抵消吸盘形变
const PRESS_PER_LEVEL: f32 = 0.75;

impl HeightCalculator {
    pub fn new(absolute_floor: f32, cube_height: f32, offset: f32) -> Self {
        Self {
            absolute_floor,
            cube_height,
            offset,
        }
    }

    /// 接近高度：第 `p` 层上方留出 `offset`
    pub fn approach(&self, position: i32) -> f32 {
        let p = position as f32;
        p * self.cube_height + self.offset + self.absolute_floor
    }

    /// 吸取/放置高度
    pub fn pickup(&self, position: i32) -> f32 {
        let p = position as f32;
        p * self.cube_height + self.absolute_floor - PRESS_PER_LEVEL * p
    }

    /// 从 `previous_z` 出发越过 `position` 层堆叠所需的抬升量
    pub fn lift(&self, previous_z: f32, position: i32) -> f32 {
        let p = position as f32;
        (p * self.cube_height + self.cube_height - previous_z).max(0.0)
    }
}
