use std::net::Ipv4Addr;

use crate::{
    annunciator::IndicatorAction,
    config::{DeviceRecord, WifiCredentials},
    error::{ConnectivityError, StoreError, TransportError},
};

pub trait SampleSource {
    fn read_raw(&mut self) -> f32;
}

pub trait WifiLink {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), ConnectivityError>;

    fn is_connected(&mut self) -> bool;

    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> Result<Ipv4Addr, ConnectivityError>;
}

pub trait Backend {
    fn post_json(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError>;
}

pub trait Clock {
    fn now_ms(&self) -> u64;

    fn sleep_ms(&mut self, ms: u64);
}

pub trait ConfigStore {
    fn load_wifi(&mut self) -> Result<WifiCredentials, StoreError>;
    fn save_wifi(&mut self, credentials: &WifiCredentials) -> Result<(), StoreError>;
    fn load_device(&mut self) -> Result<DeviceRecord, StoreError>;
    fn save_device(&mut self, record: &DeviceRecord) -> Result<(), StoreError>;
}

pub trait IndicatorSink {
    fn apply(&mut self, action: IndicatorAction);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

impl Backend for OfflineBackend {
    fn post_json(&mut self, _path: &str, _body: &[u8]) -> Result<u16, TransportError> {
        Err(TransportError::Offline)
    }
}

pub struct Io<'a> {
    pub sensor: &'a mut dyn SampleSource,
    pub link: &'a mut dyn WifiLink,
    pub backend: &'a mut dyn Backend,
    pub clock: &'a mut dyn Clock,
    pub store: &'a mut dyn ConfigStore,
    pub indicators: &'a mut dyn IndicatorSink,
}

impl Io<'_> {
    pub fn run_actions(&mut self, actions: Vec<IndicatorAction>) {
        for action in actions {
            if let IndicatorAction::Delay(ms) = action {
                self.clock.sleep_ms(ms);
                continue;
            }
            self.indicators.apply(action);
        }
    }
}
