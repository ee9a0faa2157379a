//! 抓取放置配置
//!
//! 从 TOML 加载，缺省的段和字段使用默认值。坐标既可以写成
//! `"x,y,z,r"` 字符串，也可以写成 `{ x = .., y = .., z = .. }` 表。

use crate::detection::Color;
use crate::heights::HeightCalculator;
use dobot_protocol::{DEFAULT_RESPONSE_TIMEOUT_MS, MovementProfile, Position};
use dobot_serial::{DEFAULT_BAUD_RATE, PortSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 运动参数允许的范围
pub const PROFILE_RANGE: std::ops::RangeInclusive<f32> = 1.0..=1000.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 串口设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub response_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
        }
    }
}

impl SerialConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn port_spec(&self) -> PortSpec {
        PortSpec::new(self.port.clone())
            .with_baud_rate(self.baud_rate)
            .with_read_timeout(self.response_timeout())
    }
}

/// 物理常量（单位 mm）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// 工作台面的 z 坐标
    pub absolute_floor: f32,
    pub cube_height: f32,
    pub offset: f32,
    /// 门型运动的最大抬升高度
    pub max_height: f32,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            absolute_floor: -66.0,
            cube_height: 26.0,
            offset: 2.0,
            max_height: 150.0,
        }
    }
}

impl PhysicalConstants {
    pub fn heights(&self) -> HeightCalculator {
        HeightCalculator::new(self.absolute_floor, self.cube_height, self.offset)
    }
}

/// 固定点位
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotPositions {
    pub start_point: Position,
    pub pickup_point: Position,
    pub camera: Position,
    pub red: Position,
    pub green: Position,
    pub blue: Position,
    pub yellow: Position,
}

impl Default for RobotPositions {
    fn default() -> Self {
        Self {
            start_point: Position::new(137.8012, 148.6876, 29.177, 0.0),
            pickup_point: Position::new(260.0, 0.0, 0.0, 0.0),
            camera: Position::new(190.0, -110.0, 40.0, 0.0),
            red: Position::new(40.0, 230.0, 0.0, 0.0),
            green: Position::new(100.0, 230.0, 0.0, 0.0),
            blue: Position::new(160.0, 230.0, 0.0, 0.0),
            yellow: Position::new(220.0, 230.0, 0.0, 0.0),
        }
    }
}

impl RobotPositions {
    /// 颜色对应的堆放点
    pub fn storage(&self, color: Color) -> Position {
        match color {
            Color::Red => self.red,
            Color::Green => self.green,
            Color::Blue => self.blue,
            Color::Yellow => self.yellow,
        }
    }
}

/// 等待时间（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// 回零后的稳定时间
    pub initial_delay_ms: u64,
    /// 到达相机位后的稳定时间
    pub camera_settle_ms: u64,
    /// 放置后的稳定时间
    pub return_settle_ms: u64,
    pub detection_timeout_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 25_000,
            camera_settle_ms: 10_000,
            return_settle_ms: 10_000,
            detection_timeout_ms: 10_000,
        }
    }
}

impl Timings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn camera_settle(&self) -> Duration {
        Duration::from_millis(self.camera_settle_ms)
    }

    pub fn return_settle(&self) -> Duration {
        Duration::from_millis(self.return_settle_ms)
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(self.detection_timeout_ms)
    }

    /// 所有等待为零（除识别超时外）
    pub fn immediate(detection_timeout: Duration) -> Self {
        Self {
            initial_delay_ms: 0,
            camera_settle_ms: 0,
            return_settle_ms: 0,
            detection_timeout_ms: detection_timeout.as_millis() as u64,
        }
    }
}

/// 抓取放置配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickAndPlaceConfig {
    pub serial: SerialConfig,
    pub physical: PhysicalConstants,
    pub fast: MovementProfile,
    pub slow: MovementProfile,
    pub positions: RobotPositions,
    pub timings: Timings,
}

impl Default for PickAndPlaceConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            physical: PhysicalConstants::default(),
            fast: MovementProfile::uniform(300.0),
            slow: MovementProfile::uniform(50.0),
            positions: RobotPositions::default(),
            timings: Timings::default(),
        }
    }
}

impl PickAndPlaceConfig {
    /// 解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_profile("fast", &self.fast)?;
        check_profile("slow", &self.slow)?;

        if self.physical.cube_height.is_nan() || self.physical.cube_height <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "physical.cube_height must be positive, got {}",
                self.physical.cube_height
            )));
        }
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::Invalid("serial.port must not be empty".to_string()));
        }
        if self.timings.detection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "timings.detection_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_profile(name: &str, profile: &MovementProfile) -> Result<(), ConfigError> {
    let fields = [
        ("xyz_velocity", profile.xyz_velocity),
        ("r_velocity", profile.r_velocity),
        ("xyz_acceleration", profile.xyz_acceleration),
        ("r_acceleration", profile.r_acceleration),
    ];
    for (field, value) in fields {
        if !PROFILE_RANGE.contains(&value) {
            return Err(ConfigError::Invalid(format!(
                "{}.{} must be within 1..=1000, got {}",
                name, field, value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = PickAndPlaceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.physical.cube_height, 26.0);
        assert_eq!(config.timings.initial_delay(), Duration::from_secs(25));
        assert_eq!(config.serial.baud_rate, 115_200);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PickAndPlaceConfig::from_toml_str(
            r#"
            [serial]
            port = "COM3"

            [positions]
            camera = "190.5,-110,45,0"
            red = { x = 40.0, y = 230.0, z = -10.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.port, "COM3");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.positions.camera, Position::new(190.5, -110.0, 45.0, 0.0));
        assert_eq!(config.positions.red, Position::new(40.0, 230.0, -10.0, 0.0));
        assert_eq!(
            config.positions.start_point,
            RobotPositions::default().start_point
        );
        assert_eq!(config.physical.absolute_floor, -66.0);
    }

    #[test]
    fn test_profile_out_of_range() {
        let err = PickAndPlaceConfig::from_toml_str(
            r#"
            [slow]
            xyz_velocity = 0.0
            r_velocity = 50.0
            xyz_acceleration = 50.0
            r_acceleration = 50.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("slow.xyz_velocity")));

        let mut config = PickAndPlaceConfig::default();
        config.fast.r_acceleration = 1001.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_position_text() {
        let err = PickAndPlaceConfig::from_toml_str(
            r#"
            [positions]
            camera = "1,2,3"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_cube_height_must_be_positive() {
        let mut config = PickAndPlaceConfig::default();
        config.physical.cube_height = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let mut config = PickAndPlaceConfig::default();
        config.serial.port = "/dev/ttyACM0".to_string();
        config.timings.detection_timeout_ms = 2_500;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = PickAndPlaceConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PickAndPlaceConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_storage_by_color() {
        let positions = RobotPositions::default();
        assert_eq!(positions.storage(Color::Blue), positions.blue);
        assert_eq!(positions.storage(Color::Yellow), positions.yellow);
    }
}
