use std::str::FromStr;

use crate::error::CommandError;

pub const HELP_TEXT: &[&str] = &[
    "=== COMMANDS ===",
    "set_wifi SSID PASSWORD",
    "test_alert, test_warning, calibrate, status, test_alert_backend, test_reading_backend, register_device, help",
];

const SET_WIFI_USAGE: &str = "set_wifi SSID PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetWifi { ssid: String, password: String },
    TestAlert,
    TestWarning,
    Calibrate,
    Status,
    TestAlertBackend,
    TestReadingBackend,
    RegisterDevice,
    Help,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        match name {
            "set_wifi" => {
                // The password is everything after the second space, spaces included.
                let (ssid, password) = rest
                    .split_once(' ')
                    .ok_or(CommandError::Usage(SET_WIFI_USAGE))?;
                if ssid.is_empty() || password.is_empty() {
                    return Err(CommandError::Usage(SET_WIFI_USAGE));
                }
                Ok(Self::SetWifi {
                    ssid: ssid.to_string(),
                    password: password.to_string(),
                })
            }
            _ if !rest.is_empty() => Err(CommandError::Unknown(line.to_string())),
            "test_alert" => Ok(Self::TestAlert),
            "test_warning" => Ok(Self::TestWarning),
            "calibrate" => Ok(Self::Calibrate),
            "status" => Ok(Self::Status),
            "test_alert_backend" => Ok(Self::TestAlertBackend),
            "test_reading_backend" => Ok(Self::TestReadingBackend),
            "register_device" => Ok(Self::RegisterDevice),
            "help" => Ok(Self::Help),
            _ => Err(CommandError::Unknown(line.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReply {
    pub lines: Vec<String>,
    pub restart_after_ms: Option<u64>,
}

impl CommandReply {
    pub fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            restart_after_ms: None,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn help() -> Self {
        Self {
            lines: HELP_TEXT.iter().map(|line| line.to_string()).collect(),
            restart_after_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_simple_commands() {
        assert_eq!("test_alert".parse::<Command>(), Ok(Command::TestAlert));
        assert_eq!("  status\r\n".parse::<Command>(), Ok(Command::Status));
        assert_eq!("register_device".parse::<Command>(), Ok(Command::RegisterDevice));
        assert_eq!("help".parse::<Command>(), Ok(Command::Help));
    }

    #[test]
    fn set_wifi_keeps_spaces_in_password() {
        assert_eq!(
            "set_wifi Home my secret pass".parse::<Command>(),
            Ok(Command::SetWifi {
                ssid: "Home".into(),
                password: "my secret pass".into(),
            })
        );
    }

    #[test]
    fn set_wifi_needs_both_arguments() {
        assert_eq!(
            "set_wifi Home".parse::<Command>(),
            Err(CommandError::Usage(SET_WIFI_USAGE))
        );
        assert_eq!(
            "set_wifi".parse::<Command>(),
            Err(CommandError::Usage(SET_WIFI_USAGE))
        );
    }

    #[test]
    fn unknown_input_is_rejected() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "reboot".parse::<Command>(),
            Err(CommandError::Unknown("reboot".into()))
        );
        assert_eq!(
            "status now".parse::<Command>(),
            Err(CommandError::Unknown("status now".into()))
        );
    }
}
