use std::{collections::VecDeque, net::Ipv4Addr};

use crate::{
    annunciator::IndicatorAction,
    config::{DeviceRecord, WifiCredentials},
    error::{ConnectivityError, StoreError, TransportError},
    traits::{Backend, Clock, ConfigStore, IndicatorSink, Io, SampleSource, WifiLink},
};

#[derive(Debug, Default)]
pub struct FakeClock {
    now_ms: u64,
    sleeps: Vec<u64>,
}

impl FakeClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now_ms,
            sleeps: Vec::new(),
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    pub fn sleeps(&self) -> &[u64] {
        &self.sleeps
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.now_ms += ms;
    }
}

#[derive(Debug, Default)]
pub struct ScriptedSensor {
    queue: VecDeque<f32>,
    last: f32,
    reads: usize,
}

impl ScriptedSensor {
    pub fn new(samples: impl IntoIterator<Item = f32>) -> Self {
        Self {
            queue: samples.into_iter().collect(),
            last: 0.0,
            reads: 0,
        }
    }

    pub fn repeating(value: f32) -> Self {
        Self {
            queue: VecDeque::new(),
            last: value,
            reads: 0,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.queue.push_back(value);
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SampleSource for ScriptedSensor {
    fn read_raw(&mut self) -> f32 {
        self.reads += 1;
        if let Some(value) = self.queue.pop_front() {
            self.last = value;
        }
        self.last
    }
}

#[derive(Debug)]
pub struct FakeLink {
    pub connect_after_polls: Option<u32>,
    pub ap_fails: bool,
    pub begins: u32,
    pub polls: u32,
    pub access_points: Vec<String>,
    connected: bool,
}

impl FakeLink {
    pub fn connecting_after(polls: u32) -> Self {
        Self {
            connect_after_polls: Some(polls),
            ap_fails: false,
            begins: 0,
            polls: 0,
            access_points: Vec::new(),
            connected: false,
        }
    }

    pub fn never_connecting() -> Self {
        Self {
            connect_after_polls: None,
            ..Self::connecting_after(0)
        }
    }

    pub fn drop_connection(&mut self) {
        self.connected = false;
    }
}

impl WifiLink for FakeLink {
    fn begin(&mut self, _credentials: &WifiCredentials) -> Result<(), ConnectivityError> {
        self.begins += 1;
        self.polls = 0;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        if !self.connected {
            if let Some(after) = self.connect_after_polls {
                self.connected = self.begins > 0 && self.polls >= after;
            }
        }
        self.polls += 1;
        self.connected
    }

    fn start_access_point(
        &mut self,
        ssid: &str,
        _password: &str,
    ) -> Result<Ipv4Addr, ConnectivityError> {
        if self.ap_fails {
            return Err(ConnectivityError::AccessPoint("radio busy".into()));
        }
        self.access_points.push(ssid.to_string());
        Ok(Ipv4Addr::new(192, 168, 4, 1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub path: String,
    pub body: serde_json::Value,
}

#[derive(Debug)]
pub struct RecordingBackend {
    pub posted: Vec<Posted>,
    responses: VecDeque<Result<u16, TransportError>>,
    default_status: u16,
}

impl RecordingBackend {
    pub fn accepting() -> Self {
        Self {
            posted: Vec::new(),
            responses: VecDeque::new(),
            default_status: 201,
        }
    }

    pub fn respond(&mut self, result: Result<u16, TransportError>) {
        self.responses.push_back(result);
    }

    pub fn posted_to(&self, path: &str) -> Vec<&Posted> {
        self.posted.iter().filter(|post| post.path == path).collect()
    }
}

impl Backend for RecordingBackend {
    fn post_json(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError> {
        let body = serde_json::from_slice(body).unwrap_or(serde_json::Value::Null);
        self.posted.push(Posted {
            path: path.to_string(),
            body,
        });
        self.responses
            .pop_front()
            .unwrap_or(Ok(self.default_status))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub wifi: WifiCredentials,
    pub device: DeviceRecord,
    pub fail_writes: bool,
    pub fail_device_reads: bool,
    pub wifi_writes: u32,
}

impl MemoryStore {
    pub fn with_credentials(ssid: &str, password: &str) -> Self {
        Self {
            wifi: WifiCredentials {
                ssid: ssid.to_string(),
                password: password.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load_wifi(&mut self) -> Result<WifiCredentials, StoreError> {
        Ok(self.wifi.clone())
    }

    fn save_wifi(&mut self, credentials: &WifiCredentials) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("flash full".into()));
        }
        self.wifi_writes += 1;
        self.wifi = credentials.clone();
        Ok(())
    }

    fn load_device(&mut self) -> Result<DeviceRecord, StoreError> {
        if self.fail_device_reads {
            return Err(StoreError::Backend("nvs read failed".into()));
        }
        Ok(self.device.clone())
    }

    fn save_device(&mut self, record: &DeviceRecord) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("flash full".into()));
        }
        self.device = record.clone();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingIndicators {
    pub actions: Vec<IndicatorAction>,
}

impl IndicatorSink for RecordingIndicators {
    fn apply(&mut self, action: IndicatorAction) {
        self.actions.push(action);
    }
}

pub struct Bench {
    pub sensor: ScriptedSensor,
    pub link: FakeLink,
    pub backend: RecordingBackend,
    pub clock: FakeClock,
    pub store: MemoryStore,
    pub indicators: RecordingIndicators,
}

impl Bench {
    pub fn new(store: MemoryStore, link: FakeLink) -> Self {
        Self {
            sensor: ScriptedSensor::repeating(80.0),
            link,
            backend: RecordingBackend::accepting(),
            clock: FakeClock::at(10_000),
            store,
            indicators: RecordingIndicators::default(),
        }
    }

    pub fn io(&mut self) -> Io<'_> {
        Io {
            sensor: &mut self.sensor,
            link: &mut self.link,
            backend: &mut self.backend,
            clock: &mut self.clock,
            store: &mut self.store,
            indicators: &mut self.indicators,
        }
    }
}
