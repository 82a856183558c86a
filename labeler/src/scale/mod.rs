//! Serial scale reader
//!
//! Opens the port, reads at most one line, closes the port. The scale's
//! output format is not fixed, so the weight is the first signed number
//! found anywhere in the line.

use regex::Regex;
use serde::Serialize;
use std::io::{ErrorKind, Read};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("valid number pattern"));

/// Longest line accepted before giving up on a terminator
const MAX_LINE_BYTES: usize = 256;

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("No port set")]
    NoPort,

    #[error("Could not open {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("Read failed: {0}")]
    Read(String),
}

/// One line from the scale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleReading {
    /// Decoded text, trimmed
    pub raw: String,
    /// First number in the text, if any
    pub weight: Option<f64>,
}

impl ScaleReading {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(bytes).trim().to_string();
        let weight = parse_weight_text(&raw);
        Self { raw, weight }
    }
}

/// First signed decimal or integer in `text`
pub fn parse_weight_text(text: &str) -> Option<f64> {
    NUMBER.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Read up to one line from `reader` before `timeout` elapses.
///
/// Returns `None` when nothing arrived. Bytes received before a timeout or
/// EOF are returned as a partial line. The terminator is not included.
pub fn read_line_from<R: Read + ?Sized>(
    reader: &mut R,
    timeout: Duration,
) -> std::io::Result<Option<Vec<u8>>> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while Instant::now() < deadline && line.len() < MAX_LINE_BYTES {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == b'\n' {
                    break;
                }
                line.push(byte[0]);
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                break;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(if line.is_empty() { None } else { Some(line) })
}

/// Scale on a serial port
#[derive(Debug, Clone)]
pub struct ScaleReader {
    port: String,
    baud: u32,
    timeout: Duration,
}

impl ScaleReader {
    pub fn new(port: &str, baud: u32) -> Self {
        Self {
            port: port.trim().to_string(),
            baud,
            timeout: Duration::from_secs(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    fn open(&self) -> Result<Box<dyn serialport::SerialPort>, ScaleError> {
        if self.port.is_empty() {
            return Err(ScaleError::NoPort);
        }
        serialport::new(&self.port, self.baud)
            .timeout(self.timeout)
            .open()
            .map_err(|e| ScaleError::Open {
                port: self.port.clone(),
                reason: e.to_string(),
            })
    }

    /// Read one line. `Ok(None)` means the scale sent nothing in time.
    #[instrument(skip(self), fields(port = %self.port, baud = self.baud))]
    pub async fn read(&self) -> Result<Option<ScaleReading>, ScaleError> {
        let this = self.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            let mut port = this.open()?;
            let result = read_line_from(port.as_mut(), this.timeout);
            drop(port);
            result.map_err(|e| ScaleError::Read(e.to_string()))
        })
        .await
        .map_err(|e| ScaleError::Read(e.to_string()))??;

        let reading = bytes.map(|b| ScaleReading::from_bytes(&b));
        match &reading {
            Some(r) => debug!(raw = %r.raw, weight = ?r.weight, "scale line received"),
            None => warn!("no data from scale"),
        }
        Ok(reading)
    }

    /// Open and close the port
    pub async fn probe(&self) -> Result<(), ScaleError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.open().map(drop))
            .await
            .map_err(|e| ScaleError::Read(e.to_string()))?
    }
}
