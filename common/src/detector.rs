use std::net::Ipv4Addr;

use log::{info, warn};

use crate::{
    annunciator::Annunciator,
    calibration::{Calibration, Calibrator},
    classifier::{AlertClassifier, Classification},
    commands::{Command, CommandReply},
    config::{DetectorConfig, PROVISIONING_AP_PASSWORD},
    error::{CalibrationError, ConnectivityError, TransportError},
    identity::DeviceIdentity,
    notifier::{Notifier, NotifyOutcome},
    payloads::{ConfigureRequest, StatusSnapshot},
    provisioning::{self, ConnectOutcome},
    traits::{Backend, Io, OfflineBackend},
    types::{AlertState, OperatingMode, SampleReading, Thresholds},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    pub ssid: String,
    pub address: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootReport {
    pub mode: OperatingMode,
    pub connect: ConnectOutcome,
    pub access_point: Option<AccessPoint>,
    pub calibration: Option<Calibration>,
    pub registered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub sample: SampleReading,
    pub classification: Classification,
    pub notification: NotifyOutcome,
    pub telemetry: Option<Result<(), TransportError>>,
}

#[derive(Debug)]
pub struct Detector {
    config: DetectorConfig,
    identity: DeviceIdentity,
    mode: OperatingMode,
    wifi_connected: bool,
    access_point: Option<AccessPoint>,

    classifier: AlertClassifier,
    calibrator: Calibrator,
    notifier: Notifier,
    annunciator: Annunciator,

    baseline: Option<f32>,
    last_sample: SampleReading,
    injected_raw: Option<f32>,

    last_telemetry_ms: Option<u64>,
    last_wifi_check_ms: Option<u64>,
    last_status_log_ms: Option<u64>,
}

impl Detector {
    pub fn new(mut config: DetectorConfig, identity: DeviceIdentity) -> Self {
        config.sanitize();
        Self {
            calibrator: Calibrator::new(config.calibration.clone()),
            notifier: Notifier::new(&identity, config.notification_cooldown_ms),
            config,
            identity,
            mode: OperatingMode::Provisioning,
            wifi_connected: false,
            access_point: None,
            classifier: AlertClassifier::new(Thresholds::default()),
            annunciator: Annunciator::new(),
            baseline: None,
            last_sample: SampleReading::from_raw(0.0),
            injected_raw: None,
            last_telemetry_ms: None,
            last_wifi_check_ms: None,
            last_status_log_ms: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn wifi_connected(&self) -> bool {
        self.wifi_connected
    }

    pub fn access_point(&self) -> Option<&AccessPoint> {
        self.access_point.as_ref()
    }

    pub fn thresholds(&self) -> &Thresholds {
        self.classifier.thresholds()
    }

    pub fn state(&self) -> AlertState {
        self.classifier.state()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    pub fn boot(&mut self, io: &mut Io<'_>) -> Result<BootReport, ConnectivityError> {
        info!("SmartGas detector starting, device id {}", self.identity);
        io.run_actions(Annunciator::startup_sequence());

        let credentials = io.store.load_wifi().unwrap_or_else(|err| {
            warn!("failed to load wifi credentials: {err}");
            Default::default()
        });
        let connect = provisioning::connect_with_retry(
            &mut *io.link,
            &mut *io.clock,
            &credentials,
            self.config.wifi_connect_attempts,
            self.config.wifi_retry_delay_ms,
        );
        self.mode = provisioning::decide_mode(credentials.is_complete(), &connect);

        let mut report = BootReport {
            mode: self.mode,
            connect,
            access_point: None,
            calibration: None,
            registered: false,
        };

        match self.mode {
            OperatingMode::Operational => {
                self.wifi_connected = true;
                report.calibration = self.recalibrate(io).ok();
                report.registered = self
                    .notifier
                    .register(&self.identity, &mut *io.store, &mut *io.backend)
                    .is_ok();
                if report.registered {
                    if let Err(err) = self
                        .notifier
                        .send_startup(self.classifier.thresholds(), &mut *io.backend)
                    {
                        warn!("startup notification failed: {err}");
                    }
                }
                self.last_wifi_check_ms = Some(io.clock.now_ms());
                info!("gas detector ready");
            }
            OperatingMode::Provisioning => {
                let ssid = provisioning::access_point_ssid(&self.identity);
                let address = io
                    .link
                    .start_access_point(&ssid, PROVISIONING_AP_PASSWORD)
                    .inspect_err(|err| warn!("failed to start access point {ssid}: {err}"))?;
                info!("provisioning access point {ssid} up at {address}");
                io.run_actions(Annunciator::access_point_ready());
                let access_point = AccessPoint { ssid, address };
                self.access_point = Some(access_point.clone());
                report.access_point = Some(access_point);
            }
        }

        Ok(report)
    }

    pub fn tick(&mut self, io: &mut Io<'_>) -> TickReport {
        self.maintain_wifi(io);

        let raw = match self.injected_raw.take() {
            Some(raw) => raw,
            None => io.sensor.read_raw(),
        };
        let sample = SampleReading::from_raw(raw);
        self.last_sample = sample;
        let now = io.clock.now_ms();

        let mut offline = OfflineBackend;
        let telemetry = if due(self.last_telemetry_ms, self.config.telemetry_interval_ms, now) {
            self.last_telemetry_ms = Some(now);
            let backend = route(self.wifi_connected, &mut *io.backend, &mut offline);
            let result = self.notifier.send_reading(sample.raw, backend);
            if let Err(err) = &result {
                warn!("device reading failed: {err}");
            }
            Some(result)
        } else {
            None
        };

        let classification = self.classifier.evaluate(&sample);
        if classification.transitioned {
            info!(
                "gas state -> {} (raw {:.2})",
                classification.next.as_str(),
                sample.raw
            );
            io.run_actions(self.annunciator.on_transition(classification.next));
        }

        let backend = route(self.wifi_connected, &mut *io.backend, &mut offline);
        let notification = self.notifier.maybe_notify(
            classification.transitioned,
            classification.next,
            &sample,
            self.classifier.thresholds(),
            now,
            backend,
        );

        let now = io.clock.now_ms();
        io.run_actions(self.annunciator.update(self.classifier.state(), now));

        if due(self.last_status_log_ms, self.config.status_log_interval_ms, now) {
            self.last_status_log_ms = Some(now);
            info!(
                "gas raw {:.2} | {:.1}% | {}",
                sample.raw,
                sample.percentage,
                self.classifier.state().as_str()
            );
        }

        TickReport {
            sample,
            classification,
            notification,
            telemetry,
        }
    }

    pub fn provisioning_heartbeat(&mut self, io: &mut Io<'_>) {
        io.run_actions(Annunciator::heartbeat(self.config.provisioning_blink_ms));
    }

    pub fn recalibrate(&mut self, io: &mut Io<'_>) -> Result<Calibration, CalibrationError> {
        match self.calibrator.calibrate(&mut *io.sensor, &mut *io.clock) {
            Ok(calibration) => {
                self.classifier.set_thresholds(calibration.thresholds);
                self.baseline = Some(calibration.baseline);
                Ok(calibration)
            }
            Err(err) => {
                warn!("calibration rejected, keeping previous thresholds: {err}");
                Err(err)
            }
        }
    }

    pub fn handle_line(&mut self, line: &str, io: &mut Io<'_>) -> CommandReply {
        match line.parse::<Command>() {
            Ok(command) => self.handle_command(command, io),
            Err(err) => {
                let mut reply = CommandReply::line(format!("error: {err}"));
                reply.lines.extend(CommandReply::help().lines);
                reply
            }
        }
    }

    pub fn handle_command(&mut self, command: Command, io: &mut Io<'_>) -> CommandReply {
        let mut offline = OfflineBackend;
        match command {
            Command::SetWifi { ssid, password } => {
                let existing = io.store.load_wifi().unwrap_or_default();
                let request = ConfigureRequest {
                    ssid,
                    password,
                    email: Some(existing.email),
                    mobile: Some(existing.mobile),
                };
                match provisioning::apply_configuration(&mut *io.store, request) {
                    Ok(saved) => CommandReply {
                        lines: vec![format!("WiFi saved: {}", saved.ssid)],
                        restart_after_ms: Some(self.config.form_restart_delay_ms),
                    },
                    Err(err) => CommandReply::line(format!("error: {err}")),
                }
            }
            Command::TestAlert => {
                self.injected_raw = Some(self.thresholds().emergency_threshold() + 100.0);
                CommandReply::line("TEST: Emergency simulation")
            }
            Command::TestWarning => {
                self.injected_raw = Some(self.thresholds().warning_level() + 30.0);
                CommandReply::line("TEST: Warning simulation")
            }
            Command::Calibrate => match self.recalibrate(io) {
                Ok(calibration) => CommandReply::line(format!(
                    "Calibration complete - clean air {:.2}, warning {:.2}, emergency {:.2}",
                    calibration.baseline,
                    calibration.thresholds.warning_level(),
                    calibration.thresholds.emergency_threshold()
                )),
                Err(err) => CommandReply::line(format!("Calibration rejected: {err}")),
            },
            Command::Status => self.status_report(),
            Command::TestAlertBackend => {
                let backend = route(self.wifi_connected, &mut *io.backend, &mut offline);
                match self.notifier.send_test(backend) {
                    Ok(()) => CommandReply::line("Alert backend test successful"),
                    Err(err) => CommandReply::line(format!("Alert backend test failed: {err}")),
                }
            }
            Command::TestReadingBackend => {
                let backend = route(self.wifi_connected, &mut *io.backend, &mut offline);
                match self
                    .notifier
                    .send_environment(25.0, 60.0, 1012.0, 50.0, backend)
                {
                    Ok(()) => CommandReply::line("Reading backend test successful"),
                    Err(err) => CommandReply::line(format!("Reading backend test failed: {err}")),
                }
            }
            Command::RegisterDevice => {
                let backend = route(self.wifi_connected, &mut *io.backend, &mut offline);
                match self
                    .notifier
                    .register(&self.identity, &mut *io.store, backend)
                {
                    Ok(()) => CommandReply::line("Device registration successful"),
                    Err(err) => CommandReply::line(format!("Device registration failed: {err}")),
                }
            }
            Command::Help => CommandReply::help(),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let state = self.classifier.state();
        StatusSnapshot {
            device_id: self.identity.as_str().to_string(),
            mode: self.mode.as_str(),
            wifi_connected: self.wifi_connected,
            gas_value: self.last_sample.raw,
            gas_percentage: self.last_sample.percentage,
            threshold: self.thresholds().emergency_threshold(),
            warning_level: self.thresholds().warning_level(),
            alert_active: state == AlertState::Emergency,
            warning_active: state == AlertState::Warning,
        }
    }

    fn status_report(&self) -> CommandReply {
        let status = self.status();
        let mut reply = CommandReply::line("=== STATUS ===");
        reply.push(format!("Mode: {}", status.mode.to_uppercase()));
        reply.push(format!(
            "WiFi: {}",
            if status.wifi_connected {
                "Connected"
            } else {
                "Disconnected"
            }
        ));
        reply.push(format!("Gas Value: {:.2}", status.gas_value));
        reply.push(format!("Gas %: {:.2}", status.gas_percentage));
        reply.push(format!("Threshold: {:.2}", status.threshold));
        reply.push(format!("Warning Level: {:.2}", status.warning_level));
        reply.push(format!("State: {}", self.state().as_str()));
        reply.push(format!("Device: {}", status.device_id));
        reply
    }

    // Reconnects in place. The mode never changes here.
    fn maintain_wifi(&mut self, io: &mut Io<'_>) {
        let now = io.clock.now_ms();
        if !due(self.last_wifi_check_ms, self.config.wifi_check_interval_ms, now) {
            return;
        }

        if !io.link.is_connected() {
            warn!("wifi disconnected, reconnecting");
            self.wifi_connected = false;
            let credentials = io.store.load_wifi().unwrap_or_else(|err| {
                warn!("failed to load wifi credentials: {err}");
                Default::default()
            });
            let outcome = provisioning::connect_with_retry(
                &mut *io.link,
                &mut *io.clock,
                &credentials,
                self.config.wifi_connect_attempts,
                self.config.wifi_retry_delay_ms,
            );
            self.wifi_connected = outcome.is_connected();
        } else {
            self.wifi_connected = true;
        }
        self.last_wifi_check_ms = Some(io.clock.now_ms());
    }
}

fn due(last_ms: Option<u64>, interval_ms: u64, now_ms: u64) -> bool {
    last_ms
        .map(|last| now_ms.saturating_sub(last) > interval_ms)
        .unwrap_or(true)
}

fn route<'b>(
    online: bool,
    backend: &'b mut dyn Backend,
    offline: &'b mut OfflineBackend,
) -> &'b mut dyn Backend {
    if online {
        backend
    } else {
        offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annunciator::IndicatorAction,
        endpoints::{ALERTS_ENDPOINT, DEVICES_ENDPOINT, DEVICE_READINGS_ENDPOINT},
        testing::{Bench, FakeLink, MemoryStore},
        traits::Clock,
    };
    use pretty_assertions::assert_eq;

    fn identity() -> DeviceIdentity {
        let mut store = MemoryStore::default();
        DeviceIdentity::load_or_create(&mut store, || [0x42; 16]).unwrap()
    }

    fn operational() -> (Detector, Bench) {
        let mut bench = Bench::new(
            MemoryStore::with_credentials("home", "secret"),
            FakeLink::connecting_after(0),
        );
        let mut detector = Detector::new(DetectorConfig::default(), identity());
        let report = detector.boot(&mut bench.io()).unwrap();
        assert_eq!(report.mode, OperatingMode::Operational);
        (detector, bench)
    }

    fn alert_types(bench: &Bench) -> Vec<String> {
        bench
            .backend
            .posted_to(ALERTS_ENDPOINT)
            .iter()
            .map(|post| post.body["alert_type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn connected_boot_calibrates_and_registers_once() {
        let (detector, bench) = operational();

        assert_eq!(bench.sensor.reads(), 100);
        assert_eq!(detector.baseline(), Some(80.0));
        assert_eq!(detector.thresholds().emergency_threshold(), 120.0);
        assert_eq!(bench.backend.posted_to(DEVICES_ENDPOINT).len(), 1);
        assert_eq!(alert_types(&bench), vec!["system"]);
        assert!(detector.wifi_connected());
        assert_eq!(detector.status().mode, "normal");
    }

    #[test]
    fn boot_without_credentials_starts_access_point() {
        let mut bench = Bench::new(MemoryStore::default(), FakeLink::connecting_after(0));
        let mut detector = Detector::new(DetectorConfig::default(), identity());

        let report = detector.boot(&mut bench.io()).unwrap();

        assert_eq!(report.mode, OperatingMode::Provisioning);
        assert_eq!(report.connect, ConnectOutcome::NoCredentials);
        assert_eq!(bench.link.begins, 0);
        assert_eq!(bench.link.access_points, vec!["SmartGas-424242424242".to_string()]);
        assert_eq!(bench.sensor.reads(), 0);
        assert!(bench.backend.posted.is_empty());
        assert_eq!(detector.status().mode, "setup");
    }

    #[test]
    fn failed_connection_falls_back_to_provisioning() {
        let mut bench = Bench::new(
            MemoryStore::with_credentials("home", "wrong"),
            FakeLink::never_connecting(),
        );
        let mut detector = Detector::new(DetectorConfig::default(), identity());

        let report = detector.boot(&mut bench.io()).unwrap();

        assert_eq!(report.connect, ConnectOutcome::TimedOut { attempts: 20 });
        assert_eq!(report.mode, OperatingMode::Provisioning);
        assert!(report.access_point.is_some());
    }

    #[test]
    fn access_point_failure_is_reported() {
        let mut link = FakeLink::connecting_after(0);
        link.ap_fails = true;
        let mut bench = Bench::new(MemoryStore::default(), link);
        let mut detector = Detector::new(DetectorConfig::default(), identity());

        assert!(matches!(
            detector.boot(&mut bench.io()),
            Err(ConnectivityError::AccessPoint(_))
        ));
    }

    #[test]
    fn startup_notice_requires_registration() {
        let mut bench = Bench::new(
            MemoryStore::with_credentials("home", "secret"),
            FakeLink::connecting_after(0),
        );
        bench.backend.respond(Ok(500));
        let mut detector = Detector::new(DetectorConfig::default(), identity());

        let report = detector.boot(&mut bench.io()).unwrap();

        assert!(!report.registered);
        assert!(alert_types(&bench).is_empty());
    }

    #[test]
    fn escalation_and_recovery_notify_in_order() {
        let (mut detector, mut bench) = operational();
        detector
            .classifier
            .set_thresholds(Thresholds::new(100.0, 150.0).unwrap());
        bench.backend.posted.clear();

        let mut transitions = Vec::new();
        for raw in [0.0, 120.0, 200.0, 50.0] {
            bench.sensor.push(raw);
            let report = detector.tick(&mut bench.io());
            if report.classification.transitioned {
                transitions.push(report.classification.next);
                assert_eq!(report.notification, NotifyOutcome::Sent);
            }
            bench.clock.advance(61_000);
        }

        assert_eq!(
            transitions,
            vec![AlertState::Warning, AlertState::Emergency, AlertState::Normal]
        );
        assert_eq!(
            alert_types(&bench),
            vec!["gas_warning", "gas_emergency", "gas_normal"]
        );
    }

    #[test]
    fn burst_of_transitions_is_rate_limited() {
        let (mut detector, mut bench) = operational();
        bench.backend.posted.clear();

        bench.sensor.push(110.0);
        assert_eq!(detector.tick(&mut bench.io()).notification, NotifyOutcome::Sent);
        bench.clock.advance(1_000);
        bench.sensor.push(200.0);
        let report = detector.tick(&mut bench.io());
        assert!(report.classification.transitioned);
        assert!(matches!(report.notification, NotifyOutcome::Suppressed(_)));

        assert!(bench
            .indicators
            .actions
            .contains(&IndicatorAction::Tone(crate::annunciator::ALARM_TONE_HZ)));
        assert_eq!(alert_types(&bench), vec!["gas_warning"]);
    }

    #[test]
    fn telemetry_runs_on_its_own_cadence() {
        let (mut detector, mut bench) = operational();
        bench.backend.posted.clear();

        for _ in 0..7 {
            detector.tick(&mut bench.io());
            bench.clock.advance(1_000);
        }

        assert_eq!(bench.backend.posted_to(DEVICE_READINGS_ENDPOINT).len(), 2);
    }

    #[test]
    fn dropped_link_reconnects_without_leaving_operational() {
        let (mut detector, mut bench) = operational();

        bench.link.drop_connection();
        bench.link.connect_after_polls = None;
        bench.clock.advance(30_001);
        bench.sensor.push(200.0);
        let report = detector.tick(&mut bench.io());

        assert!(!detector.wifi_connected());
        assert_eq!(detector.mode(), OperatingMode::Operational);
        assert_eq!(
            report.notification,
            NotifyOutcome::Failed(TransportError::Offline)
        );
        assert_eq!(report.classification.next, AlertState::Emergency);

        bench.link.connect_after_polls = Some(0);
        bench.clock.advance(30_001);
        detector.tick(&mut bench.io());
        assert!(detector.wifi_connected());
        assert_eq!(bench.link.begins, 2);
    }

    #[test]
    fn test_alert_injects_next_sample() {
        let (mut detector, mut bench) = operational();

        let reply = detector.handle_line("test_alert", &mut bench.io());
        assert_eq!(reply.lines, vec!["TEST: Emergency simulation".to_string()]);

        let report = detector.tick(&mut bench.io());
        assert_eq!(report.sample.raw, 220.0);
        assert_eq!(report.classification.next, AlertState::Emergency);

        bench.clock.advance(1_000);
        let report = detector.tick(&mut bench.io());
        assert_eq!(report.sample.raw, 80.0);
        assert_eq!(report.classification.next, AlertState::Normal);
    }

    #[test]
    fn set_wifi_persists_and_requests_restart() {
        let (mut detector, mut bench) = operational();
        bench.store.wifi.email = "ops@example.com".into();

        let reply = detector.handle_line("set_wifi Office pass word", &mut bench.io());

        assert_eq!(reply.restart_after_ms, Some(2_000));
        assert_eq!(bench.store.wifi.ssid, "Office");
        assert_eq!(bench.store.wifi.password, "pass word");
        assert_eq!(bench.store.wifi.email, "ops@example.com");
    }

    #[test]
    fn degenerate_recalibration_keeps_thresholds() {
        let (mut detector, mut bench) = operational();
        let before = *detector.thresholds();

        bench.sensor = crate::testing::ScriptedSensor::repeating(0.0);
        let reply = detector.handle_line("calibrate", &mut bench.io());

        assert!(reply.lines[0].starts_with("Calibration rejected"));
        assert_eq!(*detector.thresholds(), before);
    }

    #[test]
    fn unknown_command_prints_help() {
        let (mut detector, mut bench) = operational();
        let reply = detector.handle_line("reboot", &mut bench.io());
        assert_eq!(reply.lines[0], "error: unknown command `reboot`");
        assert_eq!(reply.lines[1], "=== COMMANDS ===");
        assert_eq!(reply.restart_after_ms, None);
    }

    #[test]
    fn backend_diagnostics_post_fixed_payloads() {
        let (mut detector, mut bench) = operational();
        bench.backend.posted.clear();
        let device_id = detector.identity().as_str().to_string();

        let reply = detector.handle_line("test_alert_backend", &mut bench.io());
        assert_eq!(reply.lines, vec!["Alert backend test successful".to_string()]);
        let reply = detector.handle_line("test_reading_backend", &mut bench.io());
        assert_eq!(reply.lines, vec!["Reading backend test successful".to_string()]);

        let alerts = bench.backend.posted_to(ALERTS_ENDPOINT);
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].body,
            serde_json::json!({
                "device_id": device_id,
                "alert_type": "test",
                "message": "Alert backend connection test",
                "sensor_data": { "test": "value", "gas": 123.0 }
            })
        );

        let readings = bench.backend.posted_to(DEVICE_READINGS_ENDPOINT);
        assert_eq!(readings.len(), 1);
        assert_eq!(
            readings[0].body,
            serde_json::json!({
                "device_id": device_id,
                "temperature": 25.0,
                "humidity": 60.0,
                "pressure": 1012.0,
                "gas_level": 50.0
            })
        );
        assert_eq!(detector.notifier.gate().last_sent_ms(), None);
    }

    #[test]
    fn register_device_is_idempotent_once_registered() {
        let (mut detector, mut bench) = operational();
        bench.backend.posted.clear();

        let reply = detector.handle_line("register_device", &mut bench.io());

        assert_eq!(reply.lines, vec!["Device registration successful".to_string()]);
        assert!(bench.backend.posted_to(DEVICES_ENDPOINT).is_empty());
    }

    #[test]
    fn backend_commands_fail_offline_without_a_link() {
        let mut bench = Bench::new(MemoryStore::default(), FakeLink::never_connecting());
        let mut detector = Detector::new(DetectorConfig::default(), identity());
        detector.boot(&mut bench.io()).unwrap();
        assert!(!detector.wifi_connected());

        let replies: Vec<String> = ["test_alert_backend", "test_reading_backend", "register_device"]
            .into_iter()
            .map(|line| detector.handle_line(line, &mut bench.io()).lines.join("\n"))
            .collect();

        assert_eq!(
            replies,
            vec![
                "Alert backend test failed: no network connection",
                "Reading backend test failed: no network connection",
                "Device registration failed: no network connection",
            ]
        );
        assert!(bench.backend.posted.is_empty());
        assert_eq!(bench.store.device.device_id, "");
    }

    #[test]
    fn status_command_reports_live_values() {
        let (mut detector, mut bench) = operational();
        detector.tick(&mut bench.io());

        let reply = detector.handle_line("status", &mut bench.io());

        assert_eq!(
            reply.lines,
            vec![
                "=== STATUS ===".to_string(),
                "Mode: NORMAL".to_string(),
                "WiFi: Connected".to_string(),
                "Gas Value: 80.00".to_string(),
                "Gas %: 3.20".to_string(),
                "Threshold: 120.00".to_string(),
                "Warning Level: 96.00".to_string(),
                "State: NORMAL".to_string(),
                format!("Device: {}", detector.identity()),
            ]
        );
        assert_eq!(reply.restart_after_ms, None);
    }

    #[test]
    fn provisioning_heartbeat_toggles_and_waits() {
        let mut bench = Bench::new(MemoryStore::default(), FakeLink::never_connecting());
        let mut detector = Detector::new(DetectorConfig::default(), identity());
        detector.boot(&mut bench.io()).unwrap();
        bench.indicators.actions.clear();
        let before = bench.clock.now_ms();

        detector.provisioning_heartbeat(&mut bench.io());

        assert_eq!(bench.indicators.actions, vec![IndicatorAction::ToggleStatusLed]);
        assert_eq!(bench.clock.now_ms() - before, 500);
    }
}
