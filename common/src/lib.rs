pub mod annunciator;
pub mod calibration;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod detector;
pub mod dns;
pub mod endpoints;
pub mod error;
pub mod identity;
pub mod notifier;
pub mod payloads;
pub mod provisioning;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

pub use annunciator::{Annunciator, IndicatorAction};
pub use calibration::{Calibration, Calibrator};
pub use classifier::{classify, AlertClassifier, Classification};
pub use commands::{Command, CommandReply};
pub use config::{BackendConfig, CalibrationConfig, DetectorConfig, DeviceRecord, WifiCredentials};
pub use detector::{AccessPoint, BootReport, Detector, TickReport};
pub use endpoints::*;
pub use error::{
    CalibrationError, CommandError, ConfigError, ConnectivityError, StoreError, ThresholdError,
    TransportError,
};
pub use identity::DeviceIdentity;
pub use notifier::{NotificationGate, Notifier, NotifyOutcome};
pub use payloads::{ConfigureRequest, ConfigureResponse, StatusSnapshot};
pub use provisioning::{apply_configuration, ConnectOutcome};
pub use traits::{Backend, Clock, ConfigStore, IndicatorSink, Io, OfflineBackend, SampleSource, WifiLink};
pub use types::{AlertKind, AlertState, OperatingMode, SampleReading, Thresholds};
