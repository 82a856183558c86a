//! Settings Model
//!
//! Operator configuration persisted as string key/value pairs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Setting keys
pub mod keys {
    pub const TOUCH_KEYBOARD: &str = "touch_keyboard";
    pub const SCALE_PORT: &str = "scale_port";
    pub const SCALE_BAUD: &str = "scale_baud";
    pub const PRINTER_MODE: &str = "printer_mode";
    pub const PRINTER_PORT: &str = "printer_port";
    pub const PRINTER_BAUD: &str = "printer_baud";
    pub const PRINTER_IP: &str = "printer_ip";
    pub const TEMPLATE_FOLDER: &str = "template_folder";

    /// Every key the application understands
    pub const ALL: [&str; 8] = [
        TOUCH_KEYBOARD,
        SCALE_PORT,
        SCALE_BAUD,
        PRINTER_MODE,
        PRINTER_PORT,
        PRINTER_BAUD,
        PRINTER_IP,
        TEMPLATE_FOLDER,
    ];
}

pub const DEFAULT_SCALE_PORT: &str = "COM2";
pub const DEFAULT_SCALE_BAUD: u32 = 9600;
pub const DEFAULT_PRINTER_PORT: &str = "COM1";
pub const DEFAULT_PRINTER_BAUD: u32 = 38400;
pub const DEFAULT_TEMPLATE_FOLDER: &str = "templates";

/// Setting row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Printer delivery mechanism
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Serial,
    /// Raw TCP to port 9100
    #[serde(rename = "ip")]
    Network,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Network => "ip",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" | "com" => Ok(Self::Serial),
            "ip" | "network" | "tcp" => Ok(Self::Network),
            other => Err(format!("unknown printer mode: {other}")),
        }
    }
}

/// Device settings resolved from the settings table for a single operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub scale_port: String,
    pub scale_baud: u32,
    pub printer_mode: TransportMode,
    pub printer_port: String,
    pub printer_baud: u32,
    pub printer_ip: String,
    pub template_folder: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            scale_port: DEFAULT_SCALE_PORT.to_string(),
            scale_baud: DEFAULT_SCALE_BAUD,
            printer_mode: TransportMode::Serial,
            printer_port: DEFAULT_PRINTER_PORT.to_string(),
            printer_baud: DEFAULT_PRINTER_BAUD,
            printer_ip: String::new(),
            template_folder: DEFAULT_TEMPLATE_FOLDER.to_string(),
        }
    }
}

impl DeviceSettings {
    /// Build from raw key/value pairs; missing or unparsable entries keep defaults
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let d = Self::default();
        let text = |key: &str, default: String| {
            map.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        let baud = |key: &str, default: u32| {
            map.get(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            scale_port: text(keys::SCALE_PORT, d.scale_port),
            scale_baud: baud(keys::SCALE_BAUD, d.scale_baud),
            printer_mode: map
                .get(keys::PRINTER_MODE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.printer_mode),
            printer_port: text(keys::PRINTER_PORT, d.printer_port),
            printer_baud: baud(keys::PRINTER_BAUD, d.printer_baud),
            printer_ip: map
                .get(keys::PRINTER_IP)
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            template_folder: text(keys::TEMPLATE_FOLDER, d.template_folder),
        }
    }

    /// Flatten back into key/value pairs for persistence
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::SCALE_PORT, self.scale_port.clone()),
            (keys::SCALE_BAUD, self.scale_baud.to_string()),
            (keys::PRINTER_MODE, self.printer_mode.to_string()),
            (keys::PRINTER_PORT, self.printer_port.clone()),
            (keys::PRINTER_BAUD, self.printer_baud.to_string()),
            (keys::PRINTER_IP, self.printer_ip.clone()),
            (keys::TEMPLATE_FOLDER, self.template_folder.clone()),
        ]
    }

    /// Transport that will actually be used.
    ///
    /// Network mode without an address falls back to serial.
    pub fn effective_mode(&self) -> TransportMode {
        match self.printer_mode {
            TransportMode::Network if !self.printer_ip.is_empty() => TransportMode::Network,
            _ => TransportMode::Serial,
        }
    }
}

/// Front-end capabilities, passed explicitly to widgets at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    pub touch_keyboard: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            touch_keyboard: true,
        }
    }
}

impl UiConfig {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            touch_keyboard: map
                .get(keys::TOUCH_KEYBOARD)
                .map(|v| v.trim() == "1")
                .unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_empty() {
        let s = DeviceSettings::from_map(&HashMap::new());
        assert_eq!(s, DeviceSettings::default());
        assert_eq!(s.scale_baud, 9600);
        assert_eq!(s.printer_baud, 38400);
    }

    #[test]
    fn test_bad_baud_keeps_default() {
        let s = DeviceSettings::from_map(&map(&[(keys::SCALE_BAUD, "fast")]));
        assert_eq!(s.scale_baud, DEFAULT_SCALE_BAUD);
    }

    #[test]
    fn test_network_without_ip_falls_back_to_serial() {
        let s = DeviceSettings::from_map(&map(&[(keys::PRINTER_MODE, "ip")]));
        assert_eq!(s.printer_mode, TransportMode::Network);
        assert_eq!(s.effective_mode(), TransportMode::Serial);

        let s = DeviceSettings::from_map(&map(&[
            (keys::PRINTER_MODE, "ip"),
            (keys::PRINTER_IP, "10.0.0.7"),
        ]));
        assert_eq!(s.effective_mode(), TransportMode::Network);
    }

    #[test]
    fn test_pairs_round_trip() {
        let mut s = DeviceSettings::default();
        s.printer_mode = TransportMode::Network;
        s.printer_ip = "192.168.1.50".into();
        let m: HashMap<String, String> = s
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(DeviceSettings::from_map(&m), s);
    }

    #[test]
    fn test_touch_keyboard_flag() {
        assert!(UiConfig::from_map(&HashMap::new()).touch_keyboard);
        assert!(!UiConfig::from_map(&map(&[(keys::TOUCH_KEYBOARD, "0")])).touch_keyboard);
    }

    #[test]
    fn test_transport_mode_parse() {
        assert_eq!("IP".parse::<TransportMode>().unwrap(), TransportMode::Network);
        assert_eq!("serial".parse::<TransportMode>().unwrap(), TransportMode::Serial);
        assert!("usb".parse::<TransportMode>().is_err());
    }
}
