use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityError {
    #[error("wifi credentials rejected by radio: {0}")]
    InvalidCredentials(String),
    #[error("wifi radio error: {0}")]
    Radio(String),
    #[error("access point failed to start: {0}")]
    AccessPoint(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no network connection")]
    Offline,
    #[error("request failed: {0}")]
    Request(String),
    #[error("backend answered with HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing WiFi credentials")]
    MissingCredentials,
    #[error("failed to persist configuration: {0}")]
    Store(#[from] StoreError),
}

impl ConfigError {
    // Bad input is the client's fault; a failed write is ours.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingCredentials => 400,
            Self::Store(_) => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("stored value is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("thresholds must be finite and non-negative (warning={warning}, emergency={emergency})")]
    OutOfRange { warning: f32, emergency: f32 },
    #[error("warning level {warning} must be below emergency threshold {emergency}")]
    Inverted { warning: f32, emergency: f32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("calibration needs at least one sample")]
    NoSamples,
    #[error("baseline {baseline} cannot produce valid thresholds")]
    DegenerateBaseline {
        baseline: f32,
        #[source]
        source: ThresholdError,
    },
    #[error("baseline {baseline} is below the configured minimum {minimum}")]
    BelowMinimum { baseline: f32, minimum: f32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_errors_map_to_http_status() {
        assert_eq!(ConfigError::MissingCredentials.http_status(), 400);
        assert_eq!(
            ConfigError::Store(StoreError::Backend("flash full".into())).http_status(),
            500
        );
    }
}
