use serde::{Deserialize, Serialize};

use crate::error::ThresholdError;

pub const SENSOR_FULL_SCALE: f32 = 2500.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertState {
    #[default]
    Normal,
    Warning,
    Emergency,
}

impl AlertState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Warning => "WARNING",
            Self::Emergency => "EMERGENCY",
        }
    }

    pub fn is_alarm(self) -> bool {
        matches!(self, Self::Warning | Self::Emergency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Provisioning,
    Operational,
}

impl OperatingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "setup",
            Self::Operational => "normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    GasEmergency,
    GasWarning,
    GasNormal,
    System,
    Test,
}

impl AlertKind {
    pub fn for_state(state: AlertState) -> Self {
        match state {
            AlertState::Normal => Self::GasNormal,
            AlertState::Warning => Self::GasWarning,
            AlertState::Emergency => Self::GasEmergency,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GasEmergency => "gas_emergency",
            Self::GasWarning => "gas_warning",
            Self::GasNormal => "gas_normal",
            Self::System => "system",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReading {
    pub raw: f32,
    pub percentage: f32,
}

impl SampleReading {
    // Only the percentage is clamped. Classification uses the raw value.
    pub fn from_raw(raw: f32) -> Self {
        let percentage = raw / SENSOR_FULL_SCALE * 100.0;
        let percentage = if percentage.is_nan() {
            0.0
        } else {
            percentage.clamp(0.0, 100.0)
        };
        Self { raw, percentage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    warning_level: f32,
    emergency_threshold: f32,
}

impl Thresholds {
    pub fn new(warning_level: f32, emergency_threshold: f32) -> Result<Self, ThresholdError> {
        let valid = |value: f32| value.is_finite() && value >= 0.0;
        if !valid(warning_level) || !valid(emergency_threshold) {
            return Err(ThresholdError::OutOfRange {
                warning: warning_level,
                emergency: emergency_threshold,
            });
        }
        if warning_level >= emergency_threshold {
            return Err(ThresholdError::Inverted {
                warning: warning_level,
                emergency: emergency_threshold,
            });
        }
        Ok(Self {
            warning_level,
            emergency_threshold,
        })
    }

    pub fn warning_level(&self) -> f32 {
        self.warning_level
    }

    pub fn emergency_threshold(&self) -> f32 {
        self.emergency_threshold
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_level: 100.0,
            emergency_threshold: 150.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_scaled_against_full_scale() {
        let sample = SampleReading::from_raw(1250.0);
        assert_eq!(sample.raw, 1250.0);
        assert!((sample.percentage - 50.0).abs() < 1e-4);
    }

    #[test]
    fn percentage_is_clamped_to_bounds() {
        for raw in [
            -500.0,
            -0.1,
            0.0,
            2499.0,
            2500.0,
            4095.0,
            f32::MAX,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ] {
            let sample = SampleReading::from_raw(raw);
            assert!(
                (0.0..=100.0).contains(&sample.percentage),
                "raw {raw} produced {}",
                sample.percentage
            );
        }

        assert_eq!(SampleReading::from_raw(4095.0).percentage, 100.0);
        assert_eq!(SampleReading::from_raw(-20.0).percentage, 0.0);
    }

    #[test]
    fn thresholds_enforce_ordering() {
        assert!(Thresholds::new(100.0, 150.0).is_ok());
        assert!(matches!(
            Thresholds::new(150.0, 150.0),
            Err(ThresholdError::Inverted { .. })
        ));
        assert!(matches!(
            Thresholds::new(200.0, 150.0),
            Err(ThresholdError::Inverted { .. })
        ));
        assert!(matches!(
            Thresholds::new(-1.0, 150.0),
            Err(ThresholdError::OutOfRange { .. })
        ));
        assert!(matches!(
            Thresholds::new(1.0, f32::NAN),
            Err(ThresholdError::OutOfRange { .. })
        ));
    }

    #[test]
    fn alert_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&AlertKind::GasEmergency).unwrap(),
            "\"gas_emergency\""
        );
        assert_eq!(AlertKind::for_state(AlertState::Normal).as_str(), "gas_normal");
        assert_eq!(OperatingMode::Provisioning.as_str(), "setup");
    }
}
