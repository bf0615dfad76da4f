use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub tick_interval_ms: u64,
    pub notification_cooldown_ms: u64,
    pub telemetry_interval_ms: u64,
    pub wifi_check_interval_ms: u64,
    pub status_log_interval_ms: u64,
    pub wifi_connect_attempts: u32,
    pub wifi_retry_delay_ms: u64,
    pub http_timeout_ms: u64,
    pub configure_restart_delay_ms: u64,
    pub form_restart_delay_ms: u64,
    pub provisioning_blink_ms: u64,
    pub hotspot_error_blinks: u32,
    pub dns_redirect: bool,
    pub calibration: CalibrationConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            notification_cooldown_ms: 60_000,
            telemetry_interval_ms: 5_000,
            wifi_check_interval_ms: 30_000,
            status_log_interval_ms: 5_000,
            wifi_connect_attempts: 20,
            wifi_retry_delay_ms: 1_000,
            http_timeout_ms: 10_000,
            configure_restart_delay_ms: 1_000,
            form_restart_delay_ms: 2_000,
            provisioning_blink_ms: 500,
            hotspot_error_blinks: 10,
            dns_redirect: true,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn sanitize(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(100, 10_000);
        self.wifi_connect_attempts = self.wifi_connect_attempts.clamp(1, 120);
        self.wifi_retry_delay_ms = self.wifi_retry_delay_ms.clamp(100, 10_000);
        self.http_timeout_ms = self.http_timeout_ms.clamp(1_000, 60_000);
        self.calibration.sanitize();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub samples: u32,
    pub sample_interval_ms: u64,
    pub warning_factor: f32,
    pub emergency_factor: f32,
    #[serde(default)]
    pub min_baseline: Option<f32>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            sample_interval_ms: 50,
            warning_factor: 1.2,
            emergency_factor: 1.5,
            min_baseline: None,
        }
    }
}

impl CalibrationConfig {
    pub fn sanitize(&mut self) {
        self.samples = self.samples.clamp(1, 1_000);
        if !(self.warning_factor.is_finite() && self.emergency_factor.is_finite())
            || self.warning_factor >= self.emergency_factor
        {
            self.warning_factor = 1.2;
            self.emergency_factor = 1.5;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://your-project-ref.supabase.co".to_string(),
            api_key: String::new(),
        }
    }
}

impl BackendConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
}

impl WifiCredentials {
    pub fn is_complete(&self) -> bool {
        !self.ssid.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub uuid: String,
    // Set to the uuid once the backend accepted the registration.
    #[serde(default)]
    pub device_id: String,
}

pub const WIFI_NAMESPACE: &str = "wifi-config";
pub const DEVICE_NAMESPACE: &str = "device-config";

pub const PROVISIONING_AP_PREFIX: &str = "SmartGas-";
pub const PROVISIONING_AP_PASSWORD: &str = "12345678";
