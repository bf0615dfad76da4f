use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    config::WifiCredentials,
    error::ConfigError,
    types::AlertKind,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub device_id: String,
    pub alert_type: AlertKind,
    pub message: String,
    pub sensor_data: SensorData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_value: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_percentage: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_level: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub device_id: String,
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub gas_level: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigureRequest {
    #[serde(default, alias = "wifi_ssid")]
    pub ssid: String,
    #[serde(default, alias = "wifi_password")]
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "mobile_number")]
    pub mobile: Option<String>,
}

impl ConfigureRequest {
    pub fn into_credentials(self) -> Result<WifiCredentials, ConfigError> {
        if self.ssid.is_empty() || self.password.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(WifiCredentials {
            ssid: self.ssid,
            password: self.password,
            email: self.email.unwrap_or_default(),
            mobile: self.mobile.unwrap_or_default(),
        })
    }

    // Form fields go through the same derive (and aliases) as the JSON body.
    pub fn from_form(body: &str) -> Self {
        let fields: serde_json::Map<String, serde_json::Value> = body
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (
                    decode_form_component(key),
                    serde_json::Value::String(decode_form_component(value)),
                )
            })
            .collect();

        serde_json::from_value(serde_json::Value::Object(fields)).unwrap_or_else(|err| {
            warn!("malformed setup form: {err}");
            Self::default()
        })
    }
}

fn decode_form_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|value| value.into_owned())
        .unwrap_or(spaced)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    pub status: String,
    pub message: String,
}

impl ConfigureResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: "Device configured! Restarting...".to_string(),
        }
    }

    pub fn error(err: &ConfigError) -> Self {
        Self {
            status: "error".to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub device_id: String,
    pub mode: &'static str,
    pub wifi_connected: bool,
    pub gas_value: f32,
    pub gas_percentage: f32,
    pub threshold: f32,
    pub warning_level: f32,
    pub alert_active: bool,
    pub warning_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn alert_event_matches_backend_schema() {
        let event = AlertEvent {
            device_id: "abc".into(),
            alert_type: AlertKind::GasWarning,
            message: "WARNING".into(),
            sensor_data: SensorData {
                gas_value: Some(120.0),
                gas_percentage: Some(4.5),
                warning_level: Some(100.0),
                ..Default::default()
            },
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "device_id": "abc",
                "alert_type": "gas_warning",
                "message": "WARNING",
                "sensor_data": {
                    "gas_value": 120.0,
                    "gas_percentage": 4.5,
                    "warning_level": 100.0
                }
            })
        );
    }

    #[test]
    fn configure_request_accepts_original_field_names() {
        let request: ConfigureRequest = serde_json::from_str(
            r#"{"wifi_ssid":"home","wifi_password":"pw","email":"a@b.c","mobile_number":"+1"}"#,
        )
        .unwrap();
        let creds = request.into_credentials().unwrap();
        assert_eq!(creds.ssid, "home");
        assert_eq!(creds.password, "pw");
        assert_eq!(creds.mobile, "+1");
    }

    #[test]
    fn configure_request_requires_ssid_and_password() {
        let request: ConfigureRequest = serde_json::from_str(r#"{"ssid":"home"}"#).unwrap();
        assert_eq!(
            request.into_credentials(),
            Err(ConfigError::MissingCredentials)
        );
    }

    #[test]
    fn form_body_is_url_decoded() {
        let request =
            ConfigureRequest::from_form("ssid=My+Home%20Net&password=p%26ss%3D1&email=&mobile=%2B15");
        assert_eq!(request.ssid, "My Home Net");
        assert_eq!(request.password, "p&ss=1");
        assert_eq!(request.email.as_deref(), Some(""));
        assert_eq!(request.mobile.as_deref(), Some("+15"));
    }

    #[test]
    fn form_body_accepts_original_field_names() {
        let request = ConfigureRequest::from_form(
            "wifi_ssid=Lab&wifi_password=hunter2&mobile_number=%2B4470&unused=1",
        );
        let creds = request.into_credentials().unwrap();
        assert_eq!(creds.ssid, "Lab");
        assert_eq!(creds.password, "hunter2");
        assert_eq!(creds.mobile, "+4470");
        assert_eq!(creds.email, "");
    }

    #[test]
    fn form_body_without_password_is_missing_credentials() {
        let request = ConfigureRequest::from_form("ssid=Lab");
        assert_eq!(
            request.into_credentials(),
            Err(ConfigError::MissingCredentials)
        );
    }
}
