use log::{info, warn};
use serde::Serialize;

use crate::{
    endpoints::{ALERTS_ENDPOINT, DEVICES_ENDPOINT, DEVICE_READINGS_ENDPOINT},
    error::TransportError,
    identity::DeviceIdentity,
    payloads::{AlertEvent, DeviceReading, DeviceRegistration, SensorData},
    traits::{Backend, ConfigStore},
    types::{AlertKind, AlertState, SampleReading, Thresholds},
};

const CREATED: u16 = 201;
const CONFLICT: u16 = 409;

#[derive(Debug, Clone)]
pub struct NotificationGate {
    last_sent_ms: Option<u64>,
    cooldown_ms: u64,
}

impl NotificationGate {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            last_sent_ms: None,
            cooldown_ms,
        }
    }

    pub fn is_open(&self, now_ms: u64) -> bool {
        self.last_sent_ms
            .map(|last| now_ms.saturating_sub(last) > self.cooldown_ms)
            .unwrap_or(true)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.last_sent_ms
            .map(|last| {
                (self.cooldown_ms + 1).saturating_sub(now_ms.saturating_sub(last))
            })
            .unwrap_or(0)
    }

    pub fn record_sent(&mut self, now_ms: u64) {
        self.last_sent_ms = Some(now_ms);
    }

    pub fn last_sent_ms(&self) -> Option<u64> {
        self.last_sent_ms
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    CooldownActive { remaining_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoTransition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Suppressed(SuppressReason),
    Skipped(SkipReason),
    Failed(TransportError),
}

#[derive(Debug, Clone)]
pub struct Notifier {
    device_id: String,
    gate: NotificationGate,
}

impl Notifier {
    pub fn new(identity: &DeviceIdentity, cooldown_ms: u64) -> Self {
        Self {
            device_id: identity.as_str().to_string(),
            gate: NotificationGate::new(cooldown_ms),
        }
    }

    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    // The gate only advances on a 201 answer.
    pub fn maybe_notify(
        &mut self,
        transitioned: bool,
        next: AlertState,
        sample: &SampleReading,
        thresholds: &Thresholds,
        now_ms: u64,
        backend: &mut dyn Backend,
    ) -> NotifyOutcome {
        if !transitioned {
            return NotifyOutcome::Skipped(SkipReason::NoTransition);
        }
        if !self.gate.is_open(now_ms) {
            let remaining_ms = self.gate.remaining_ms(now_ms);
            info!(
                "{} notification suppressed, cooldown {}ms remaining",
                next.as_str(),
                remaining_ms
            );
            return NotifyOutcome::Suppressed(SuppressReason::CooldownActive { remaining_ms });
        }

        let event = self.state_event(next, sample, thresholds);
        match self.dispatch(&event, backend) {
            Ok(()) => {
                self.gate.record_sent(now_ms);
                NotifyOutcome::Sent
            }
            Err(err) => NotifyOutcome::Failed(err),
        }
    }

    pub fn state_event(
        &self,
        state: AlertState,
        sample: &SampleReading,
        thresholds: &Thresholds,
    ) -> AlertEvent {
        let mut sensor_data = SensorData {
            gas_value: Some(sample.raw),
            gas_percentage: Some(sample.percentage),
            ..Default::default()
        };
        let message = match state {
            AlertState::Emergency => {
                sensor_data.threshold = Some(thresholds.emergency_threshold());
                format!("EMERGENCY: Gas leak detected! Value: {:.2}", sample.raw)
            }
            AlertState::Warning => {
                sensor_data.warning_level = Some(thresholds.warning_level());
                format!("WARNING: Elevated gas levels. Value: {:.2}", sample.raw)
            }
            AlertState::Normal => "ALL CLEAR: Gas levels normal".to_string(),
        };

        AlertEvent {
            device_id: self.device_id.clone(),
            alert_type: AlertKind::for_state(state),
            message,
            sensor_data,
        }
    }

    pub fn send_startup(
        &self,
        thresholds: &Thresholds,
        backend: &mut dyn Backend,
    ) -> Result<(), TransportError> {
        let event = AlertEvent {
            device_id: self.device_id.clone(),
            alert_type: AlertKind::System,
            message: "Gas detector started and calibrated".to_string(),
            sensor_data: SensorData {
                status: Some("online".to_string()),
                threshold: Some(thresholds.emergency_threshold()),
                device_id: Some(self.device_id.clone()),
                ..Default::default()
            },
        };
        self.dispatch(&event, backend)
    }

    pub fn send_test(&self, backend: &mut dyn Backend) -> Result<(), TransportError> {
        let event = AlertEvent {
            device_id: self.device_id.clone(),
            alert_type: AlertKind::Test,
            message: "Alert backend connection test".to_string(),
            sensor_data: SensorData {
                test: Some("value".to_string()),
                gas: Some(123.0),
                ..Default::default()
            },
        };
        self.dispatch(&event, backend)
    }

    pub fn dispatch(
        &self,
        event: &AlertEvent,
        backend: &mut dyn Backend,
    ) -> Result<(), TransportError> {
        info!("sending {} alert", event.alert_type.as_str());
        let result = post(backend, ALERTS_ENDPOINT, event).and_then(expect_created);
        match &result {
            Ok(()) => info!("{} alert accepted", event.alert_type.as_str()),
            Err(err) => warn!("{} alert failed: {err}", event.alert_type.as_str()),
        }
        result
    }

    pub fn send_reading(
        &self,
        gas_level: f32,
        backend: &mut dyn Backend,
    ) -> Result<(), TransportError> {
        self.send_environment(0.0, 0.0, 0.0, gas_level, backend)
    }

    pub fn send_environment(
        &self,
        temperature: f32,
        humidity: f32,
        pressure: f32,
        gas_level: f32,
        backend: &mut dyn Backend,
    ) -> Result<(), TransportError> {
        let reading = DeviceReading {
            device_id: self.device_id.clone(),
            temperature,
            humidity,
            pressure,
            gas_level,
        };
        post(backend, DEVICE_READINGS_ENDPOINT, &reading).and_then(expect_created)
    }

    // 201 and 409 both count as registered.
    pub fn register(
        &self,
        identity: &DeviceIdentity,
        store: &mut dyn ConfigStore,
        backend: &mut dyn Backend,
    ) -> Result<(), TransportError> {
        let mut record = store.load_device().unwrap_or_else(|err| {
            warn!("failed to load device record: {err}");
            Default::default()
        });
        if record.device_id == identity.as_str() {
            info!("device already registered");
            return Ok(());
        }

        let registration = DeviceRegistration {
            id: identity.as_str().to_string(),
            name: format!("SmartGas Detector {}", identity.short_id()),
            description: "ESP32 based gas leak detector".to_string(),
            location: "Unknown".to_string(),
        };
        let status = post(backend, DEVICES_ENDPOINT, &registration).map_err(|err| {
            warn!("device registration failed: {err}");
            err
        })?;
        match status {
            CREATED => info!("device registered"),
            CONFLICT => info!("device already known to backend"),
            other => {
                warn!("device registration rejected with HTTP {other}");
                return Err(TransportError::Status(other));
            }
        }

        record.uuid = identity.as_str().to_string();
        record.device_id = identity.as_str().to_string();
        if let Err(err) = store.save_device(&record) {
            warn!("failed to persist registration: {err}");
        }
        Ok(())
    }
}

fn post<T: Serialize>(
    backend: &mut dyn Backend,
    path: &str,
    body: &T,
) -> Result<u16, TransportError> {
    let body = serde_json::to_vec(body).map_err(|err| TransportError::Request(err.to_string()))?;
    backend.post_json(path, &body)
}

fn expect_created(status: u16) -> Result<(), TransportError> {
    if status == CREATED {
        Ok(())
    } else {
        Err(TransportError::Status(status))
    }
}
