use log::{info, warn};

use crate::{
    config::{WifiCredentials, PROVISIONING_AP_PREFIX},
    error::{ConfigError, ConnectivityError},
    identity::DeviceIdentity,
    payloads::ConfigureRequest,
    traits::{Clock, ConfigStore, WifiLink},
    types::OperatingMode,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    NoCredentials,
    Connected { attempts: u32 },
    TimedOut { attempts: u32 },
    Rejected(ConnectivityError),
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

pub fn decide_mode(has_stored_credentials: bool, outcome: &ConnectOutcome) -> OperatingMode {
    if has_stored_credentials && outcome.is_connected() {
        OperatingMode::Operational
    } else {
        OperatingMode::Provisioning
    }
}

pub fn connect_with_retry(
    link: &mut dyn WifiLink,
    clock: &mut dyn Clock,
    credentials: &WifiCredentials,
    attempts: u32,
    retry_delay_ms: u64,
) -> ConnectOutcome {
    if !credentials.is_complete() {
        info!("no wifi credentials stored");
        return ConnectOutcome::NoCredentials;
    }

    info!("connecting to {}", credentials.ssid);
    if let Err(err) = link.begin(credentials) {
        warn!("wifi association failed to start: {err}");
        return ConnectOutcome::Rejected(err);
    }

    let mut polls = 0;
    while !link.is_connected() {
        if polls >= attempts {
            warn!("wifi connection timed out after {polls} attempts");
            return ConnectOutcome::TimedOut { attempts: polls };
        }
        clock.sleep_ms(retry_delay_ms);
        polls += 1;
    }

    info!("wifi connected after {polls} attempts");
    ConnectOutcome::Connected { attempts: polls }
}

pub fn apply_configuration(
    store: &mut dyn ConfigStore,
    request: ConfigureRequest,
) -> Result<WifiCredentials, ConfigError> {
    let credentials = request.into_credentials()?;
    store.save_wifi(&credentials)?;
    info!("wifi credentials saved for {}", credentials.ssid);
    Ok(credentials)
}

pub fn access_point_ssid(identity: &DeviceIdentity) -> String {
    format!("{PROVISIONING_AP_PREFIX}{}", identity.short_id())
}
